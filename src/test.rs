#[cfg(test)]
pub mod test {
    use anyhow::Result;
    use std::time::{Duration, Instant};

    use crate::{
        arrayboard::{ArrayBoard, Cell},
        evaluation::{WIN_SCORE, WIN_THRESHOLD},
        mcts::{Mcts, MctsConfig},
        session::play_game,
        solver::{Solver, SolverConfig},
        BitBoard, EngineKind, GameState, Player, HEIGHT, WIDTH,
    };

    fn solver() -> Result<Solver> {
        Ok(Solver::new(SolverConfig {
            table_capacity: 1 << 16,
            ..SolverConfig::default()
        })?)
    }

    #[test]
    pub fn empty_board_opens_in_the_centre() -> Result<()> {
        let mut solver = solver()?;
        let result = solver.search(&BitBoard::new(), 1)?;
        assert_eq!(result.column, WIDTH / 2);
        assert!(result.column_scores.iter().all(Option::is_some));
        Ok(())
    }

    #[test]
    pub fn immediate_win_at_every_depth() -> Result<()> {
        // player one has three stacked in the last column, player two three on the bottom row
        let board = BitBoard::from_moves("717273")?;
        assert_eq!(board.to_move(), Player::One);
        assert_eq!(board.threatened_moves(), BitBoard::cell_mask(0, 3));
        for depth in 1..=7 {
            let mut solver = solver()?;
            let result = solver.search(&board, depth)?;
            assert_eq!(result.column, 6, "depth {}", depth);
            assert!(result.score >= WIN_THRESHOLD);
        }
        Ok(())
    }

    #[test]
    pub fn single_threat_is_blocked() -> Result<()> {
        // player two has three stacked in the last column, player one to move
        let board = BitBoard::from_moves("171727")?;
        assert_eq!(board.threatened_moves(), BitBoard::cell_mask(3, 6));
        for depth in 2..=7 {
            let mut solver = solver()?;
            assert_eq!(solver.search(&board, depth)?.column, 6, "depth {}", depth);
        }
        Ok(())
    }

    #[test]
    pub fn wins_are_scored_by_their_length() -> Result<()> {
        // player one has three stacked in the first column and wins with the 7th piece
        let board = BitBoard::from_moves("121217")?;
        let mut solver = solver()?;
        let result = solver.search(&board, 5)?;
        assert_eq!(result.column, 0);
        assert_eq!(result.score, WIN_SCORE - 7);
        Ok(())
    }

    #[test]
    pub fn row_with_one_open_end_is_completed() -> Result<()> {
        // player one has columns 1-3 on the bottom row, column 4 completes it
        let board = BitBoard::from_moves("112233")?;
        assert_eq!(board.to_move(), Player::One);
        for depth in 1..=6 {
            let mut solver = solver()?;
            let result = solver.search(&board, depth)?;
            assert_eq!(result.column, 3, "depth {}", depth);
            assert!(result.score >= WIN_THRESHOLD);
        }
        Ok(())
    }

    #[test]
    pub fn grid_positions_can_be_searched() -> Result<()> {
        let mut cells = [[Cell::Empty; WIDTH]; HEIGHT];
        // a bottom row three for player one, player two stacked on top
        for column in 1..4 {
            cells[0][column] = Cell::PlayerOne;
            cells[1][column] = Cell::PlayerTwo;
        }
        let board = ArrayBoard::from_cells(cells, Player::One).to_bitboard()?;
        assert_eq!(board.num_moves(), 6);

        let mut solver = solver()?;
        let result = solver.search(&board, 3)?;
        // either end of the row wins
        assert_eq!(result.column, 0);
        assert!(result.column_scores[4].map_or(false, |score| score >= WIN_THRESHOLD));
        Ok(())
    }

    #[test]
    pub fn tables_speed_up_search() -> Result<()> {
        let board = BitBoard::from_moves("4453")?;
        let mut timings = vec![];

        let full = SolverConfig {
            table_capacity: 1 << 18,
            ..SolverConfig::default()
        };
        for config in vec![SolverConfig::classic(), full] {
            let mut solver = Solver::new(config)?;
            let start_time = Instant::now();
            let result = solver.search(&board, 7)?;
            let time = start_time.elapsed();
            timings.push((result.column, result.score, result.stats.nodes, time));
        }

        println!(
            "Depth 7 search\nclassic: {} positions in {:.3}ms, full: {} positions in {:.3}ms",
            timings[0].2,
            timings[0].3.as_secs_f64() * 1000.0,
            timings[1].2,
            timings[1].3.as_secs_f64() * 1000.0,
        );
        assert_eq!(timings[0].0, timings[1].0);
        assert_eq!(timings[0].1, timings[1].1);
        assert!(timings[1].2 < timings[0].2);
        Ok(())
    }

    #[test]
    pub fn mcts_respects_time_limit() -> Result<()> {
        let mut mcts = Mcts::new(MctsConfig {
            iterations: u32::MAX,
            time_limit: Some(Duration::from_millis(50)),
            seed: Some(5),
            ..MctsConfig::default()
        })?;
        let result = mcts.search(&BitBoard::new())?;
        assert!(result.stats.iterations > 0);
        assert!(result.stats.elapsed < Duration::from_secs(5));
        Ok(())
    }

    #[test]
    pub fn alpha_beta_beats_random_rollouts() -> Result<()> {
        let mut config = crate::engine::EngineConfig::new(EngineKind::AlphaBeta);
        config.solver.table_capacity = 1 << 16;
        let mut alpha_beta = config.build()?;

        let mut config = crate::engine::EngineConfig::new(EngineKind::Mcts);
        config.mcts.iterations = 50;
        config.mcts.rollout_randomness = 1.0;
        config.mcts.seed = Some(11);
        let mut mcts = config.build()?;

        let start_time = Instant::now();
        let record = play_game(alpha_beta.as_mut(), mcts.as_mut(), 6)?;
        println!(
            "Alpha-beta against 50 iteration MCTS\n{} moves in {:.3}s, outcome {:?}",
            record.moves.len(),
            start_time.elapsed().as_secs_f64(),
            record.outcome
        );
        assert_ne!(record.outcome, GameState::Won(Player::Two));
        Ok(())
    }
}
