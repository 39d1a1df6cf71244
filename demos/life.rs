use strata::life::{Board, Life, State};
use tracing_subscriber::EnvFilter;

fn pretty_print(generation: usize, board: &Board) {
    let domain = board.domain();
    println!("generation {}", generation);
    for i in domain.x.iter() {
        let row: String = domain
            .y
            .iter()
            .map(|j| {
                if i == domain.x.lower || i == domain.x.upper - 1 {
                    '-'
                } else if j == domain.y.lower || j == domain.y.upper - 1 {
                    '|'
                } else if board.get(i, j) == State::Alive {
                    '#'
                } else {
                    ' '
                }
            })
            .collect();
        println!("{}", row);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = std::env::args().collect();
    let height = args.get(1).and_then(|s| s.parse::<usize>().ok()).unwrap_or(3);
    let width = args.get(2).and_then(|s| s.parse::<usize>().ok()).unwrap_or(3);
    let generations = args.get(3).and_then(|s| s.parse::<usize>().ok()).unwrap_or(10);

    let world = strata::WorldBuilder::new().build();
    let mut life = Life::new(&world, height, width);
    let (h, w) = (height as i64, width as i64);
    // a horizontal blinker in the middle of the board
    life.seed(&[(h / 2 + 1, w / 2), (h / 2 + 1, w / 2 + 1), (h / 2 + 1, w / 2 + 2)]);
    pretty_print(0, life.board());
    life.run(generations, pretty_print)?;
    println!("population: {}", life.board().population()?);
    Ok(())
}
