//! Round-robin contest between AIs over several boards.

use crate::agent::AgentFactory;
use crate::config::check_num;
use crate::engine::EngineFactory;
use crate::game::{Game, GameResult};
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering as CmpOrdering,
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Scheduling parameters of a contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestSettings {
    /// Matches played per pairing and board.
    pub matches_per_game: usize,
    /// Size of the pool running games.
    pub game_threads: usize,
    /// Size of the pool running matches.
    pub match_threads: usize,
    /// Master seed; drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ContestSettings {
    pub fn validate(&self) -> Result<()> {
        check_num(self.matches_per_game, 1..=100_000).context("invalid matches per game")?;
        check_num(self.game_threads, 1..=1024).context("invalid number of game threads")?;
        check_num(self.match_threads, 1..=1024).context("invalid number of match threads")?;
        Ok(())
    }
}

/// Running statistics of one AI over all of its games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub victories: usize,
    pub n_games: usize,
    pub avg_score: AccumulatorReport,
    pub avg_rounds: AccumulatorReport,
    pub avg_win_rate: AccumulatorReport,
}

/// Ranked standings plus every game played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContestResult {
    pub seed: u64,
    pub standings: Vec<Standing>,
    pub games: Vec<GameResult>,
}

impl fmt::Display for ContestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "contest seed {}", self.seed)?;
        writeln!(
            f,
            "{:>4}  {:<20} {:>9} {:>6} {:>10} {:>10} {:>9}",
            "rank", "ai", "victories", "games", "avg score", "avg rounds", "win rate"
        )?;
        for (i_rank, standing) in self.standings.iter().enumerate() {
            writeln!(
                f,
                "{:>4}  {:<20} {:>9} {:>6} {:>10.2} {:>10.2} {:>9.3}",
                i_rank + 1,
                standing.name,
                standing.victories,
                standing.n_games,
                standing.avg_score.mean,
                standing.avg_rounds.mean,
                standing.avg_win_rate.mean,
            )?;
        }
        Ok(())
    }
}

struct Tally {
    victories: usize,
    score: Accumulator,
    rounds: Accumulator,
    win_rate: Accumulator,
}

impl Tally {
    fn new() -> Self {
        Self {
            victories: 0,
            score: Accumulator::new(),
            rounds: Accumulator::new(),
            win_rate: Accumulator::new(),
        }
    }

    fn add(&mut self, wins: usize, score: f64, rounds: f64, win_rate: f64) {
        self.victories += wins;
        self.score.add(score);
        self.rounds.add(rounds);
        self.win_rate.add(win_rate);
    }
}

/// Every unordered pair of AIs meets on every board.
pub struct Contest {
    ais: Vec<Box<dyn AgentFactory>>,
    boards: Vec<Box<dyn EngineFactory>>,
    settings: ContestSettings,
}

impl Contest {
    pub fn new(
        ais: Vec<Box<dyn AgentFactory>>,
        boards: Vec<Box<dyn EngineFactory>>,
        settings: ContestSettings,
    ) -> Self {
        Self {
            ais,
            boards,
            settings,
        }
    }

    pub fn run(&self) -> Result<ContestResult> {
        if self.ais.len() < 2 {
            bail!("a contest needs at least two AIs, but has {}", self.ais.len());
        }
        if self.boards.is_empty() {
            bail!("a contest needs at least one board");
        }
        for (i_ai, ai) in self.ais.iter().enumerate() {
            if self.ais[..i_ai].iter().any(|other| other.name() == ai.name()) {
                bail!("AI name {} is used more than once", ai.name());
            }
        }
        self.settings.validate().context("invalid contest settings")?;

        let seed = match self.settings.seed {
            Some(seed) => seed,
            None => ChaCha12Rng::try_from_os_rng()?.random(),
        };
        let mut rng = ChaCha12Rng::seed_from_u64(seed);

        let mut jobs = Vec::new();
        for i_player in 0..self.ais.len() {
            for i_opponent in (i_player + 1)..self.ais.len() {
                for i_board in 0..self.boards.len() {
                    jobs.push((i_player, i_opponent, i_board, rng.random::<u64>()));
                }
            }
        }
        log::info!(
            "running {} games of {} matches (seed {seed})",
            jobs.len(),
            self.settings.matches_per_game
        );

        let game_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.game_threads)
            .build()
            .context("failed to build game thread pool")?;
        let match_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.match_threads)
            .build()
            .context("failed to build match thread pool")?;

        let n_done = AtomicUsize::new(0);
        let run_one = |&(i_player, i_opponent, i_board, game_seed): &(usize, usize, usize, u64)| {
            let player = self.ais[i_player].as_ref();
            let opponent = self.ais[i_opponent].as_ref();
            let board = self.boards[i_board].as_ref();
            let result = Game::new(player, opponent, board, self.settings.matches_per_game)
                .run(&match_pool, game_seed)
                .with_context(|| {
                    format!(
                        "game {} vs {} on {} failed",
                        player.name(),
                        opponent.name(),
                        board.name()
                    )
                });

            let done = n_done.fetch_add(1, Ordering::Relaxed) + 1;
            let progress = 100.0 * done as f64 / jobs.len() as f64;
            log::info!("completed {progress:06.2}%");
            result
        };

        let game_results: Vec<Result<GameResult>> =
            game_pool.install(|| jobs.par_iter().map(run_one).collect());

        let mut games = Vec::with_capacity(game_results.len());
        for result in game_results {
            games.push(result?);
        }

        let standings = self.rank(&jobs, &games);
        Ok(ContestResult {
            seed,
            standings,
            games,
        })
    }

    fn rank(&self, jobs: &[(usize, usize, usize, u64)], games: &[GameResult]) -> Vec<Standing> {
        let mut tallies: Vec<_> = self.ais.iter().map(|_| Tally::new()).collect();

        for (&(i_player, i_opponent, _, _), game) in jobs.iter().zip(games) {
            tallies[i_player].add(
                game.player_wins,
                game.player_score.mean,
                game.rounds.mean,
                game.player_win_rate,
            );
            tallies[i_opponent].add(
                game.opponent_wins,
                game.opponent_score.mean,
                game.rounds.mean,
                1.0 - game.player_win_rate,
            );
        }

        let mut standings: Vec<_> = self
            .ais
            .iter()
            .zip(tallies)
            .map(|(ai, tally)| Standing {
                name: ai.name().to_string(),
                victories: tally.victories,
                n_games: tally.score.n_vals(),
                avg_score: tally.score.report(),
                avg_rounds: tally.rounds.report(),
                avg_win_rate: tally.win_rate.report(),
            })
            .collect();

        standings.sort_by(compare_standings);
        standings
    }
}

/// Victories, then average score, then average rounds; all descending.
fn compare_standings(a: &Standing, b: &Standing) -> CmpOrdering {
    b.victories
        .cmp(&a.victories)
        .then_with(|| b.avg_score.mean.total_cmp(&a.avg_score.mean))
        .then_with(|| b.avg_rounds.mean.total_cmp(&a.avg_rounds.mean))
}
