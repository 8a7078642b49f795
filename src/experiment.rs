//! Experiment bookkeeping
//!
//! An [`Experiment`] owns the run configuration and the directory its results
//! go to. The directory name is derived from the `configs` arguments that
//! differ from their defaults, so two runs with the same settings collide and
//! the second one is refused. Entering the experiment yields an
//! [`ExperimentScope`] carrying the run's [`ExperimentLog`]; dropping the scope
//! flushes and closes the log.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tracing::{dispatcher, Dispatch, Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, FormatTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::config::{Config, CONFIGS};
use crate::error::{Result, SeqPriorError};

const TIME_FORMAT: &str = "%m-%d %H:%M";

/// File name of the configuration snapshot written into each experiment directory
pub const CONFIG_SNAPSHOT: &str = "config.json";

/// `MM-DD HH:MM LEVEL: message`
struct LineFormat {
    timer: ChronoLocal,
}

impl LineFormat {
    fn new() -> Self {
        LineFormat {
            timer: ChronoLocal::new(TIME_FORMAT.to_string()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        self.timer.format_time(&mut writer)?;
        write!(writer, " {}: ", event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Log sink for one experiment.
///
/// Events are routed through the sink's own dispatcher; nothing is installed
/// process-wide.
pub struct ExperimentLog {
    dispatch: Dispatch,
    _guard: Option<WorkerGuard>,
}

impl ExperimentLog {
    /// INFO-level log written to `path`, truncating any existing file
    pub fn to_file(path: &Path) -> Result<Self> {
        let file = fs::File::create(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .event_format(LineFormat::new())
            .finish();

        Ok(ExperimentLog {
            dispatch: Dispatch::new(subscriber),
            _guard: Some(guard),
        })
    }

    /// DEBUG-level log on stderr
    pub fn to_console() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(Level::DEBUG)
            .event_format(LineFormat::new())
            .finish();

        ExperimentLog {
            dispatch: Dispatch::new(subscriber),
            _guard: None,
        }
    }

    pub fn info(&self, message: &str) {
        dispatcher::with_default(&self.dispatch, || tracing::info!("{}", message));
    }

    pub fn debug(&self, message: &str) {
        dispatcher::with_default(&self.dispatch, || tracing::debug!("{}", message));
    }

    pub fn warn(&self, message: &str) {
        dispatcher::with_default(&self.dispatch, || tracing::warn!("{}", message));
    }

    /// Run `f` with this log as the current thread's default subscriber, so
    /// plain `tracing` macros inside it land in the experiment log
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }
}

impl std::fmt::Debug for ExperimentLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExperimentLog")
            .field("file", &self._guard.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct Experiment {
    config: Config,
    experiment_dir: PathBuf,
    directories: BTreeMap<String, PathBuf>,
}

impl Experiment {
    /// Set up the experiment directory for `config`.
    ///
    /// Outside debug mode the directory must not exist yet; it is created
    /// along with a configuration snapshot. The prior and vocabulary
    /// directories are created in every mode.
    pub fn new(config: Config) -> Result<Self> {
        let experiment_dir = Self::derive_dir(&config)?;

        if !config.debug {
            if let Some(parent) = experiment_dir.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::create_dir(&experiment_dir).map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => SeqPriorError::ExperimentExists(experiment_dir.clone()),
                _ => SeqPriorError::Io(e),
            })?;
            config.save_json(&experiment_dir.join(CONFIG_SNAPSHOT))?;
        }

        fs::create_dir_all(&config.prior_file)?;
        fs::create_dir_all(&config.vocab_file)?;

        Ok(Experiment {
            config,
            experiment_dir,
            directories: BTreeMap::new(),
        })
    }

    /// Concatenation of `key` + `value` for every non-default `configs`
    /// argument, in key order. Empty when everything is at its default.
    ///
    /// Values use their JSON form, so booleans read `true`/`false` and a run
    /// with `--f1-score` lands in `f1_scoretrue`.
    pub fn identifier(config: &Config) -> Result<String> {
        Ok(config
            .non_default_values(CONFIGS)?
            .into_iter()
            .map(|(key, value)| format!("{}{}", key, value))
            .collect())
    }

    fn derive_dir(config: &Config) -> Result<PathBuf> {
        if config.debug {
            return Ok(PathBuf::from("."));
        }
        let identifier = Self::identifier(config)?;
        if identifier.is_empty() {
            Ok(config.experiments_prefix.clone())
        } else {
            Ok(config.experiments_prefix.join(identifier))
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn experiment_dir(&self) -> &Path {
        &self.experiment_dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.experiment_dir.join(&self.config.logfile_name)
    }

    /// Create `<experiment_dir>/<name>` and remember it under `name`
    pub fn register_directory(&mut self, name: &str) -> Result<PathBuf> {
        let directory = self.experiment_dir.join(name);
        fs::create_dir_all(&directory)?;
        self.directories.insert(name.to_string(), directory.clone());
        Ok(directory)
    }

    /// Remember every subdirectory already present in the experiment directory
    pub fn register_existing_directories(&mut self) -> Result<()> {
        for entry in fs::read_dir(&self.experiment_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                self.directories.insert(name, entry.path());
            }
        }
        Ok(())
    }

    pub fn directory(&self, name: &str) -> Option<&Path> {
        self.directories.get(name).map(PathBuf::as_path)
    }

    /// Open the log: a file in the experiment directory, or the console in
    /// debug mode
    pub fn enter(self) -> Result<ExperimentScope> {
        let log = if self.config.debug {
            ExperimentLog::to_console()
        } else {
            ExperimentLog::to_file(&self.log_file())?
        };

        if !self.config.debug {
            log.info(&format!("log saving to {}", self.log_file().display()));
        }
        log.info(&format!("{:?}", self.config));

        Ok(ExperimentScope {
            experiment: self,
            log,
        })
    }
}

/// An entered experiment. The log stays open until the scope is dropped or
/// [`exit`](ExperimentScope::exit) is called.
#[derive(Debug)]
pub struct ExperimentScope {
    experiment: Experiment,
    log: ExperimentLog,
}

impl ExperimentScope {
    pub fn log(&self) -> &ExperimentLog {
        &self.log
    }

    /// Flush and close the log, handing the experiment back
    pub fn exit(self) -> Experiment {
        let ExperimentScope { experiment, log } = self;
        drop(log);
        experiment
    }
}

impl Deref for ExperimentScope {
    type Target = Experiment;

    fn deref(&self) -> &Experiment {
        &self.experiment
    }
}

impl DerefMut for ExperimentScope {
    fn deref_mut(&mut self) -> &mut Experiment {
        &mut self.experiment
    }
}
