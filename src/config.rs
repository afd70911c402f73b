use crate::agent::{AgentFactory, AiConfig, Strategy};
use crate::contest::ContestSettings;
use crate::engine::{Board, BoardVariant, EngineFactory};
use crate::types::GridSize;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Contest configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scheduling parameters.
    pub contest: ContestSettings,

    /// Grid bounds shared by every board.
    #[serde(default)]
    pub grid: GridSize,

    /// Spawn layouts; every pairing plays on each of them.
    pub boards: Vec<BoardVariant>,

    /// Competing AIs.
    pub ais: Vec<AiConfig>,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.contest.validate()?;

        check_num(self.grid.max_x, 2..=1000).context("invalid grid width")?;
        check_num(self.grid.max_y, 2..=1000).context("invalid grid height")?;

        check_num(self.boards.len(), 1..).context("invalid number of boards")?;
        for (i_board, board) in self.boards.iter().enumerate() {
            check_board(board, self.grid).with_context(|| format!("invalid board {i_board}"))?;
        }
        check_unique(self.boards.iter().map(|board| board.name.as_str()))
            .context("invalid board names")?;

        check_num(self.ais.len(), 2..).context("invalid number of AIs")?;
        for ai in &self.ais {
            if let Strategy::Genetic(params) = &ai.strategy {
                params
                    .validate()
                    .with_context(|| format!("invalid genetic params of {}", ai.name))?;
            }
        }
        check_unique(self.ais.iter().map(|ai| ai.name.as_str())).context("invalid AI names")?;

        Ok(())
    }

    pub fn agent_factories(&self) -> Vec<Box<dyn AgentFactory>> {
        self.ais
            .iter()
            .map(|ai| Box::new(ai.clone()) as Box<dyn AgentFactory>)
            .collect()
    }

    pub fn engine_factories(&self) -> Vec<Box<dyn EngineFactory>> {
        self.boards
            .iter()
            .map(|variant| {
                Box::new(Board {
                    size: self.grid,
                    variant: variant.clone(),
                }) as Box<dyn EngineFactory>
            })
            .collect()
    }

    pub fn ai(&self, name: &str) -> Result<&AiConfig> {
        self.ais
            .iter()
            .find(|ai| ai.name == name)
            .with_context(|| format!("no AI named {name:?}"))
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_board(board: &BoardVariant, grid: GridSize) -> Result<()> {
    for spot in [board.first, board.second] {
        if !grid.contains(spot) {
            bail!("spawn spot {spot} is outside the {}x{} grid", grid.max_x, grid.max_y);
        }
    }
    if board.first == board.second {
        bail!("both agents spawn at {}", board.first);
    }
    Ok(())
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = Vec::new();
    for name in names {
        if name.is_empty() {
            bail!("names must not be empty");
        }
        if seen.contains(&name) {
            bail!("name {name:?} is used more than once");
        }
        seen.push(name);
    }
    Ok(())
}
