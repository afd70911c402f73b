use crate::agent::{Agent, AgentFactory};
use crate::config::Config;
use crate::contest::{Contest, ContestResult};
use crate::protocol::{InputStream, read_judge_round};
use anyhow::{Context, Result};
use glob::glob;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    contest_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(contest_dir: P) -> Result<Self> {
        let contest_dir = contest_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(contest_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { contest_dir, cfg })
    }

    pub fn run_contest(&self) -> Result<()> {
        let contest = Contest::new(
            self.cfg.agent_factories(),
            self.cfg.engine_factories(),
            self.cfg.contest.clone(),
        );
        let result = contest.run().context("failed to run contest")?;

        let result_idx = self
            .result_files()
            .context("failed to list result files")?
            .len();
        let result_file = self.result_file(result_idx);
        save_result(&result, &result_file)
            .with_context(|| format!("failed to save {result_file:?}"))?;
        log::info!("saved {result_file:?}");

        println!("{result}");
        Ok(())
    }

    pub fn report(&self) -> Result<()> {
        for result_file in self.result_files().context("failed to list result files")? {
            let result = load_result(&result_file)
                .with_context(|| format!("failed to load {result_file:?}"))?;
            println!("{}", result_file.display());
            println!("{result}");
        }
        Ok(())
    }

    pub fn clean(&self) -> Result<()> {
        for result_file in self.result_files().context("failed to list result files")? {
            fs::remove_file(&result_file)
                .with_context(|| format!("failed to remove {result_file:?}"))?;
            log::info!("removed {result_file:?}");
        }
        Ok(())
    }

    /// Serve one AI over the judge protocol on stdin/stdout.
    pub fn play(&self, ai_name: &str) -> Result<()> {
        let ai = self.cfg.ai(ai_name)?;
        let seed = match self.cfg.contest.seed {
            Some(seed) => seed,
            None => ChaCha12Rng::try_from_os_rng()?.random(),
        };
        let mut agent = ai
            .create(self.cfg.grid, seed)
            .with_context(|| format!("failed to create {ai_name}"))?;

        let stdin = io::stdin();
        let mut reader = stdin.lock();
        let stdout = io::stdout();
        let mut writer = stdout.lock();

        let mut n_rounds = 0;
        while let Some(vals) = read_judge_round(&mut reader)? {
            n_rounds += 1;
            let action = agent
                .next_action(&mut InputStream::new(vals))
                .with_context(|| format!("failed to choose action in round {n_rounds}"))?;
            writeln!(writer, "{action}").context("failed to write action")?;
            writer.flush().context("failed to flush writer stream")?;
        }
        log::info!("input ended after {n_rounds} rounds");
        Ok(())
    }

    fn result_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.contest_dir.join("result-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<_> = glob(pattern)
            .context("failed to glob result files")?
            .filter_map(Result::ok)
            .collect();
        files.sort();
        Ok(files)
    }

    fn result_file(&self, result_idx: usize) -> PathBuf {
        self.contest_dir
            .join(format!("result-{result_idx:04}.msgpack"))
    }
}

fn save_result<P: AsRef<Path>>(result: &ContestResult, file: P) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, result).context("failed to serialize result")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_result<P: AsRef<Path>>(file: P) -> Result<ContestResult> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let result = decode::from_read(&mut reader).context("failed to deserialize result")?;
    Ok(result)
}
