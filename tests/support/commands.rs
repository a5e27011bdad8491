//! Command helper methods for Test.

use std::path::Path;
use std::process::Output;

use assert_cmd::Command;

use super::Test;

impl Test {
    /// Create a gpass command isolated to this environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and XDG dirs inside the temporary home
    /// - GPASS_CONFIG_DIR pointing at the test config dir
    /// - NO_COLOR so output can be matched verbatim
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("gpass").expect("failed to find gpass binary");
        cmd.env("HOME", self.home.path());
        cmd.env("XDG_DATA_HOME", self.home.path().join(".local/share"));
        cmd.env("XDG_CONFIG_HOME", self.home.path().join(".config"));
        cmd.env("GPASS_CONFIG_DIR", self.config_dir());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("GPASS_LOG");
        cmd.env_remove("GPASS_PW_DEFAULT_LENGTH");
        cmd.env_remove("GPASS_CONFIG_COUNT");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `gpass init` with the plain backend on a plain directory.
    pub fn init_cmd(&self, alias: &str, path: &Path) -> Output {
        let mut cmd = self.cmd();
        cmd.args(["init", "--crypto", "plain", "--storage", "fs", "--path"])
            .arg(path);
        if !alias.is_empty() {
            cmd.args(["--alias", alias]);
        }
        cmd.output().expect("failed to run gpass init")
    }

    /// Shortcut for `gpass insert` with the password piped on stdin.
    pub fn insert(&self, name: &str, password: &str) -> Output {
        self.cmd()
            .args(["insert", name])
            .write_stdin(format!("{}\n", password))
            .output()
            .expect("failed to run gpass insert")
    }

    /// Shortcut for `gpass insert --multiline`.
    pub fn insert_body(&self, name: &str, body: &str) -> Output {
        self.cmd()
            .args(["insert", "--multiline", "--force", name])
            .write_stdin(body.to_string())
            .output()
            .expect("failed to run gpass insert -m")
    }

    /// Shortcut for `gpass show`.
    pub fn show(&self, name: &str) -> Output {
        self.cmd()
            .args(["show", name])
            .output()
            .expect("failed to run gpass show")
    }

    /// Shortcut for `gpass show --password`.
    pub fn password(&self, name: &str) -> Output {
        self.cmd()
            .args(["show", "--password", name])
            .output()
            .expect("failed to run gpass show -o")
    }

    /// Shortcut for `gpass ls --flat`.
    pub fn ls_flat(&self) -> Output {
        self.cmd()
            .args(["ls", "--flat"])
            .output()
            .expect("failed to run gpass ls")
    }

    /// Run gpass with arbitrary arguments.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run gpass")
    }
}
