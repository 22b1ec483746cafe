use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::Context as _;
use clap::Args;
use rand::{SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use squall_engine::{Board, Color, Piece, PieceShape, QueuedPiece, drop_shape};
use squall_evaluator::SearchParams;
use squall_pilot::{DecisionOutcome, DecisionPipeline, DecisionRequest};

use super::{ProfileArg, SkillArg};

#[derive(Debug, Clone, Args)]
pub struct SimulateArg {
    /// Seed for deterministic piece generation
    #[clap(long, default_value_t = 0)]
    seed: u64,
    /// Number of pieces to play before stopping
    #[clap(long, default_value_t = 200)]
    pieces: usize,
    #[clap(long, value_enum, default_value_t = SkillArg::Hurricane)]
    skill: SkillArg,
    #[clap(long, value_enum, default_value_t = ProfileArg::Standard)]
    profile: ProfileArg,
    /// Write a recording of the session to this file as JSON
    #[clap(long)]
    record: Option<PathBuf>,
}

const COLS: usize = 10;
const ROWS: usize = 20;

/// Shapes the simulator draws from, weighted uniformly.
fn piece_catalog() -> Vec<PieceShape> {
    [
        "#",
        "##",
        "###",
        "##\n##",
        "#.\n##",
        ".#\n##",
        "##\n#.",
    ]
    .into_iter()
    .map(PieceShape::from_ascii)
    .collect()
}

fn draw(rng: &mut Pcg32, shapes: &[PieceShape]) -> QueuedPiece {
    let shape = shapes.choose(rng).expect("catalog is not empty").clone();
    let color = *Color::ALL.choose(rng).expect("colors are not empty");
    QueuedPiece::new(shape, color)
}

fn spawn_piece(queued: QueuedPiece) -> Piece {
    let x = i32::try_from((COLS - queued.shape.width()) / 2).unwrap_or(0);
    Piece::new(queued.shape, queued.color, x, 0)
}

pub fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    let skill = arg.skill.into();
    let mut pipeline = DecisionPipeline::inline(skill, arg.profile.into(), SearchParams::default());
    if arg.record.is_some() {
        pipeline.start_recording(skill);
    }

    let mut rng = Pcg32::seed_from_u64(arg.seed);
    let shapes = piece_catalog();
    let mut board = Board::new(COLS, ROWS);
    let mut queue: Vec<QueuedPiece> = (0..3).map(|_| draw(&mut rng, &shapes)).collect();

    let mut placed = 0_usize;
    let mut cleared = 0_usize;
    let mut forced_drops = 0_usize;
    let mut cause = "pieceLimit";

    for _ in 0..arg.pieces {
        let piece = spawn_piece(queue.remove(0));
        queue.push(draw(&mut rng, &shapes));

        let request = DecisionRequest {
            board: board.clone(),
            piece: piece.clone(),
            queue: queue.clone(),
            skill_level: skill,
            ufo_active: false,
            shake_active: false,
            capture_decision_meta: false,
        };
        let DecisionOutcome::Completed(response) = pipeline
            .request_decision(request)
            .context("decision rejected")?
        else {
            unreachable!("inline pipeline completes synchronously");
        };

        match response.best_placement {
            Some(placement) if !placement.game_ending => {
                board.fill_shape(&placement.shape, placement.x, placement.y, piece.color);
            }
            Some(_) => {
                cause = "topOut";
                break;
            }
            None => {
                // Forced drop: land the piece where it is, straight down.
                forced_drops += 1;
                let Some(y) = drop_shape(&board, &piece.shape, piece.x) else {
                    cause = "topOut";
                    break;
                };
                board.fill_shape(&piece.shape, piece.x, y, piece.color);
            }
        }
        placed += 1;
        cleared += board.clear_full_rows();
    }

    if let Some(path) = &arg.record {
        let recording = pipeline
            .stop_recording(&board, cause)
            .context("recording was not active")?;
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &recording)?;
    }

    println!("seed:          {}", arg.seed);
    println!("pieces placed: {placed}");
    println!("rows cleared:  {cleared}");
    println!("forced drops:  {forced_drops}");
    println!("stack height:  {}", board.stack_height());
    println!("final mode:    {:?}", pipeline.mode());
    println!("cause:         {cause}");
    Ok(())
}
