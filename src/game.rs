//! Single matches and repeated games between one pairing.

use crate::agent::{Agent, AgentFactory};
use crate::engine::EngineFactory;
use crate::field::Snapshot;
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one match. Index 0 is the player, index 1 the opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub player: String,
    pub opponent: String,
    pub initial_state: Snapshot,
    pub scores: [u32; 2],
    pub rounds: usize,
    pub winner: usize,
}

/// One engine, two fresh agents, played until someone wins.
pub struct Match<'a> {
    player: &'a dyn AgentFactory,
    opponent: &'a dyn AgentFactory,
    board: &'a dyn EngineFactory,
}

impl<'a> Match<'a> {
    pub fn new(
        player: &'a dyn AgentFactory,
        opponent: &'a dyn AgentFactory,
        board: &'a dyn EngineFactory,
    ) -> Self {
        Self {
            player,
            opponent,
            board,
        }
    }

    pub fn run(&self, seed: u64) -> Result<MatchResult> {
        let mut engine = self.board.create().context("failed to create engine")?;
        let size = engine.initial_state().size();

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let player = self
            .player
            .create(size, rng.random())
            .with_context(|| format!("failed to create {}", self.player.name()))?;
        let opponent = self
            .opponent
            .create(size, rng.random())
            .with_context(|| format!("failed to create {}", self.opponent.name()))?;
        let mut agents: [Box<dyn Agent>; 2] = [player, opponent];

        let mut rounds = 0;
        let winner = loop {
            rounds += 1;
            let outcome = engine
                .play_round(&mut agents)
                .with_context(|| format!("failed to play round {rounds}"))?;
            if let Some(winner) = outcome {
                break winner;
            }
        };

        let result = MatchResult {
            player: self.player.name().to_string(),
            opponent: self.opponent.name().to_string(),
            initial_state: engine.initial_state().clone(),
            scores: [engine.score(0), engine.score(1)],
            rounds,
            winner,
        };
        log::debug!(
            "{} vs {} on {}: winner {} after {rounds} rounds, scores {:?}",
            result.player,
            result.opponent,
            self.board.name(),
            winner,
            result.scores
        );
        Ok(result)
    }
}

/// Aggregate over the matches of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub player: String,
    pub opponent: String,
    pub board: String,
    pub initial_state: Snapshot,
    pub n_matches: usize,
    pub player_wins: usize,
    pub opponent_wins: usize,
    pub player_score: AccumulatorReport,
    pub opponent_score: AccumulatorReport,
    pub rounds: AccumulatorReport,
    pub player_win_rate: f64,
}

/// Repeated matches of the same pairing on the same board.
pub struct Game<'a> {
    player: &'a dyn AgentFactory,
    opponent: &'a dyn AgentFactory,
    board: &'a dyn EngineFactory,
    n_matches: usize,
}

impl<'a> Game<'a> {
    pub fn new(
        player: &'a dyn AgentFactory,
        opponent: &'a dyn AgentFactory,
        board: &'a dyn EngineFactory,
        n_matches: usize,
    ) -> Self {
        Self {
            player,
            opponent,
            board,
            n_matches,
        }
    }

    /// Run every match on `pool`, wait for all of them, then aggregate.
    pub fn run(&self, pool: &ThreadPool, seed: u64) -> Result<GameResult> {
        if self.n_matches == 0 {
            bail!("a game needs at least one match");
        }

        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..self.n_matches).map(|_| rng.random()).collect();

        let match_results: Vec<Result<MatchResult>> = pool.install(|| {
            seeds
                .par_iter()
                .map(|&seed| Match::new(self.player, self.opponent, self.board).run(seed))
                .collect()
        });

        let mut matches = Vec::with_capacity(match_results.len());
        for (i_match, result) in match_results.into_iter().enumerate() {
            matches.push(result.with_context(|| format!("match {i_match} failed"))?);
        }

        self.aggregate(&matches)
    }

    fn aggregate(&self, matches: &[MatchResult]) -> Result<GameResult> {
        let Some(first) = matches.first() else {
            bail!("no matches to aggregate");
        };

        let mut player_score = Accumulator::new();
        let mut opponent_score = Accumulator::new();
        let mut rounds = Accumulator::new();
        let mut player_win_rate = Accumulator::new();
        let mut player_wins = 0;

        for (i_match, result) in matches.iter().enumerate() {
            if result.player != first.player {
                bail!(
                    "match {i_match} used player {} instead of {}",
                    result.player,
                    first.player
                );
            }
            if result.opponent != first.opponent {
                bail!(
                    "match {i_match} used opponent {} instead of {}",
                    result.opponent,
                    first.opponent
                );
            }
            if result.initial_state != first.initial_state {
                bail!("match {i_match} started from a different initial state");
            }

            let player_won = result.winner == 0;
            player_wins += usize::from(player_won);
            player_score.add(result.scores[0] as f64);
            opponent_score.add(result.scores[1] as f64);
            rounds.add(result.rounds as f64);
            player_win_rate.add(if player_won { 1.0 } else { 0.0 });
        }

        Ok(GameResult {
            player: first.player.clone(),
            opponent: first.opponent.clone(),
            board: self.board.name().to_string(),
            initial_state: first.initial_state.clone(),
            n_matches: matches.len(),
            player_wins,
            opponent_wins: matches.len() - player_wins,
            player_score: player_score.report(),
            opponent_score: opponent_score.report(),
            rounds: rounds.report(),
            player_win_rate: player_win_rate.mean(),
        })
    }
}
