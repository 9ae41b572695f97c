//! Generator configuration.
//!
//! One immutable value created at startup and threaded through the run;
//! nothing here mutates after construction.

use camino::{Utf8Path, Utf8PathBuf};

/// Knobs for one translation run, plus the derived output filenames.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Appended to every output filename.
    pub ninja_suffix: String,
    /// Directory the output files are written into.
    pub ninja_dir: Utf8PathBuf,
    /// When set, enables compiler-wrapper injection and the local pool.
    pub goma_dir: Option<Utf8PathBuf>,
    /// Depth of the local pool when `goma_dir` is set.
    pub num_jobs: usize,
    /// Extract rule descriptions from silent `echo` prefixes.
    pub detect_android_echo: bool,
    /// Emit the self-regeneration rules.
    pub gen_regen_rule: bool,
    /// Fail the envlist check on change instead of refreshing the snapshot.
    pub error_on_env_change: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            ninja_suffix: String::new(),
            ninja_dir: Utf8PathBuf::from("."),
            goma_dir: None,
            num_jobs: 1,
            detect_android_echo: false,
            gen_regen_rule: false,
            error_on_env_change: false,
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn ninja_file_name(&self) -> String {
        format!("build{}.ninja", self.ninja_suffix)
    }

    #[must_use]
    pub fn ninja_file(&self) -> Utf8PathBuf {
        self.ninja_dir.join(self.ninja_file_name())
    }

    #[must_use]
    pub fn shell_script_file_name(&self) -> String {
        format!("ninja{}.sh", self.ninja_suffix)
    }

    #[must_use]
    pub fn shell_script_file(&self) -> Utf8PathBuf {
        self.ninja_dir.join(self.shell_script_file_name())
    }

    #[must_use]
    pub fn envlist_file_name(&self) -> String {
        format!(".kati_env{}", self.ninja_suffix)
    }

    #[must_use]
    pub fn envlist_file(&self) -> Utf8PathBuf {
        self.ninja_dir.join(self.envlist_file_name())
    }

    #[must_use]
    pub fn lunch_file(&self) -> Utf8PathBuf {
        self.ninja_dir.join(format!(".kati_lunch{}", self.ninja_suffix))
    }

    /// Whether the wrapper should `cd` to its own directory before
    /// invoking Ninja.
    #[must_use]
    pub(crate) fn runs_in_place(&self) -> bool {
        self.ninja_dir == Utf8Path::new(".")
    }
}
