use std::path::PathBuf;

use super::{Probe, ProbeKind, ProbeOutput};
use crate::context::Context;
use crate::error::ProbeError;
use crate::exec::first_output_line;
use crate::fs::home_relative;

/// A config file that exists and will be copied into the backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Configured display name (e.g. `.ssh/config`).
    pub name: String,
    /// Configured path, as written (e.g. `~/.ssh/config`).
    pub path: String,
    /// Resolved absolute location.
    pub source: PathBuf,
    /// Location relative to the home directory; `None` for files outside it,
    /// which are reported but not archived.
    pub relative: Option<PathBuf>,
    /// Configured description.
    pub description: String,
    /// File size at scan time.
    pub size_bytes: u64,
}

/// A developer tool found on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInfo {
    /// Program name.
    pub name: String,
    /// Configured description.
    pub description: String,
    /// First line of the version command's output, if it produced any.
    pub version: Option<String>,
}

/// Output of [`ScanEnvironment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentScan {
    /// Config files found.
    pub config_files: Vec<ConfigFile>,
    /// Names of configured files that do not exist.
    pub missing: Vec<String>,
    /// Number of config files checked.
    pub total_checked: usize,
    /// Installed tools.
    pub tools: Vec<ToolInfo>,
}

/// Record shell and tool config files plus installed developer tools.
#[derive(Debug)]
pub struct ScanEnvironment;

impl Probe for ScanEnvironment {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Environment
    }

    fn scan(&self, ctx: &Context) -> Result<ProbeOutput, ProbeError> {
        let env = &ctx.config.environment;
        let mut scan = EnvironmentScan {
            total_checked: env.config_files.len(),
            ..EnvironmentScan::default()
        };

        for entry in &env.config_files {
            let source = ctx.expand(&entry.path);
            match std::fs::metadata(&source) {
                Ok(meta) if meta.is_file() => {
                    let relative = home_relative(&source, &ctx.home);
                    if relative.is_none() {
                        ctx.log.warn(&format!(
                            "{} is outside the home directory and will not be archived",
                            source.display()
                        ));
                    }
                    ctx.log.debug(&format!("found: {}", entry.name));
                    scan.config_files.push(ConfigFile {
                        name: entry.name.clone(),
                        path: entry.path.clone(),
                        source,
                        relative,
                        description: entry.description.clone(),
                        size_bytes: meta.len(),
                    });
                }
                _ => scan.missing.push(entry.name.clone()),
            }
        }

        for tool in &env.tools {
            if !ctx.executor.which(&tool.name) {
                ctx.log.debug(&format!("not installed: {}", tool.name));
                continue;
            }
            let args: Vec<&str> = tool.version_args.iter().map(String::as_str).collect();
            let version = match ctx.executor.run_unchecked(&tool.name, &args) {
                Ok(result) => first_output_line(&result),
                Err(e) => {
                    ctx.log
                        .debug(&format!("{} version query failed: {e}", tool.name));
                    None
                }
            };
            scan.tools.push(ToolInfo {
                name: tool.name.clone(),
                description: tool.description.clone(),
                version,
            });
        }

        ctx.log.info(&format!(
            "{}/{} config files, {} tools",
            scan.config_files.len(),
            scan.total_checked,
            scan.tools.len()
        ));
        Ok(ProbeOutput::Environment(scan))
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigFileSpec, ToolSpec};
    use crate::test_helpers::{FakeExecutor, TestEnv};

    fn scan(env: &TestEnv) -> EnvironmentScan {
        match ScanEnvironment.scan(&env.ctx).unwrap() {
            ProbeOutput::Environment(s) => s,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn records_found_and_missing_config_files() {
        let env = TestEnv::new(FakeExecutor::new());
        env.write(".gitconfig", "[user]\n");
        env.write(".ssh/config", "Host *\n");
        std::fs::create_dir_all(env.path(".vimrc")).unwrap();

        let scan = scan(&env);
        assert_eq!(scan.total_checked, 12);
        let names: Vec<&str> = scan.config_files.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![".gitconfig", ".ssh/config"]);
        assert_eq!(scan.config_files[0].size_bytes, 7);
        assert_eq!(
            scan.config_files[1].relative,
            Some(PathBuf::from(".ssh/config"))
        );
        assert!(scan.missing.contains(&".vimrc".to_string()), "directories are not files");
        assert_eq!(scan.missing.len(), 10);
    }

    #[test]
    fn file_outside_home_is_not_archivable() {
        let outside = tempfile::tempdir().unwrap();
        let file = outside.path().join("hosts");
        std::fs::write(&file, "127.0.0.1 localhost\n").unwrap();
        let mut config = Config::default();
        config.environment.config_files = vec![ConfigFileSpec {
            name: "hosts".to_string(),
            path: file.to_string_lossy().into_owned(),
            description: String::new(),
        }];
        config.environment.tools.clear();
        let env = TestEnv::with_config(FakeExecutor::new(), config);

        let scan = scan(&env);
        assert_eq!(scan.config_files.len(), 1);
        assert_eq!(scan.config_files[0].relative, None);
    }

    #[test]
    fn records_installed_tool_versions() {
        let mut config = Config::default();
        config.environment.config_files.clear();
        config.environment.tools = vec![
            ToolSpec {
                name: "git".to_string(),
                description: "Version control system".to_string(),
                version_args: vec!["--version".to_string()],
            },
            ToolSpec {
                name: "java".to_string(),
                description: "Java runtime".to_string(),
                version_args: vec!["-version".to_string()],
            },
            ToolSpec {
                name: "ruby".to_string(),
                description: "Ruby interpreter".to_string(),
                version_args: vec!["--version".to_string()],
            },
        ];
        let executor = FakeExecutor::new()
            .with_response("git", true, "git version 2.44.0\n")
            .with_output("java", true, "", "openjdk version \"21.0.2\"\nmore\n");
        let env = TestEnv::with_config(executor, config);

        let scan = scan(&env);
        assert_eq!(scan.tools.len(), 2, "ruby is not installed");
        assert_eq!(scan.tools[0].version.as_deref(), Some("git version 2.44.0"));
        assert_eq!(
            scan.tools[1].version.as_deref(),
            Some("openjdk version \"21.0.2\"")
        );
        assert_eq!(env.executor.calls_to("java"), vec![vec!["-version"]]);
    }

    #[test]
    fn silent_tool_has_no_version() {
        let mut config = Config::default();
        config.environment.config_files.clear();
        config.environment.tools = vec![ToolSpec {
            name: "docker".to_string(),
            description: String::new(),
            version_args: vec!["--version".to_string()],
        }];
        let env = TestEnv::with_config(FakeExecutor::new().with_tool("docker"), config);
        let scan = scan(&env);
        assert_eq!(scan.tools.len(), 1);
        assert_eq!(scan.tools[0].version, None);
    }
}
