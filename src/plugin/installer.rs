use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use crate::error::InstallError;
use crate::model::config::Configuration;
use crate::model::plugin_type::PluginType;
use crate::model::registry::{PluginKey, PluginRegistry};

const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Totals for a finished install run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InstallSummary {
    pub plugins: usize,
    pub files: usize,
}

/// Copies selected plugins from the scanned tree into the plugins path.
pub struct PluginInstaller<'a> {
    config: &'a Configuration,
    registry: &'a PluginRegistry,
}

impl<'a> PluginInstaller<'a> {
    pub fn new(config: &'a Configuration, registry: &'a PluginRegistry) -> Self {
        Self { config, registry }
    }

    /// `<prefix><plugins_path>`, normalised.
    pub fn plugins_root(&self) -> PathBuf {
        normalize_path(
            Path::new(&format!("{}{}", self.config.prefix, self.config.plugins_path)),
            &self.config.working_dir,
        )
    }

    /// `<prefix><plugins_path>/<destination dir>`, normalised.
    pub fn destination_for(&self, kind: PluginType) -> PathBuf {
        let joined = format!(
            "{}{}/{}",
            self.config.prefix,
            self.config.plugins_path,
            kind.destination_dir()
        );
        normalize_path(Path::new(&joined), &self.config.working_dir)
    }

    /// Installs each key in order and stops at the first failure.
    ///
    /// Plugins installed before a failure stay on disk.
    pub fn install_all(
        &self,
        keys: &[PluginKey],
        out: &mut impl Write,
    ) -> Result<InstallSummary, InstallError> {
        let mut summary = InstallSummary::default();

        for key in keys {
            summary.files += self.install(key, out)?;
            summary.plugins += 1;
        }

        Ok(summary)
    }

    /// Installs one plugin, returning the number of files copied.
    pub fn install(&self, key: &PluginKey, out: &mut impl Write) -> Result<usize, InstallError> {
        let record = self
            .registry
            .get(key)
            .ok_or_else(|| InstallError::UnknownPlugin {
                token: key.to_string(),
            })?;
        let destination = self.destination_for(key.kind);

        self.report(key, &record.paths, &destination, out)?;

        fs::create_dir_all(&destination)
            .map_err(|err| InstallError::filesystem("create", &destination, err))?;

        for source in self.registry.source_paths(record) {
            let Some(file_name) = source.file_name() else {
                return Err(InstallError::filesystem(
                    "copy",
                    &source,
                    io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"),
                ));
            };
            let target = destination.join(file_name);
            // fs::copy truncates the target first, which would empty the source.
            if same_file(&source, &target) {
                return Err(InstallError::filesystem(
                    "copy",
                    &source,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("same file as {}", target.display()),
                    ),
                ));
            }
            fs::copy(&source, &target)
                .map_err(|err| InstallError::filesystem("copy", &source, err))?;
            tracing::debug!("copied {} -> {}", source.display(), target.display());
        }

        tracing::info!("installed {key} into {}", destination.display());
        Ok(record.paths.len())
    }

    fn report(
        &self,
        key: &PluginKey,
        paths: &[PathBuf],
        destination: &Path,
        out: &mut impl Write,
    ) -> Result<(), InstallError> {
        let (green, cyan, reset) = if self.config.color {
            (GREEN, CYAN, RESET)
        } else {
            ("", "", "")
        };
        let sources: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();

        writeln!(out, "{green}Installing {key}{reset}")
            .and_then(|()| writeln!(out, "\t{cyan}source:{reset} {sources:?}"))
            .and_then(|()| writeln!(out, "\t{cyan}destination:{reset} {}", destination.display()))
            .map_err(InstallError::Output)
    }
}

fn same_file(source: &Path, target: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(source), Ok(target)) => source == target,
        _ => false,
    }
}

/// Makes `path` absolute against `base` and folds `.`, `..` and repeated
/// separators without touching the filesystem.
pub fn normalize_path(path: &Path, base: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if normalized.parent().is_some() {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Selection;
    use crate::plugin::scanner::tests::{sample_tree, touch};
    use crate::plugin::{scanner, selector};
    use tempfile::TempDir;

    fn config_for(source: &Path, prefix: &Path) -> Configuration {
        Configuration {
            plugins_path: "/usr/share/mcollective/plugins".to_string(),
            prefix: prefix.display().to_string(),
            selection: Selection::All,
            list_only: false,
            source_dir: source.to_path_buf(),
            working_dir: source.to_path_buf(),
            color: false,
        }
    }

    fn installed_files(root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push(path.strip_prefix(root).unwrap().to_path_buf());
                }
            }
        }
        files.sort();
        files
    }

    fn plugins_dir(prefix: &TempDir) -> PathBuf {
        prefix.path().join("usr/share/mcollective/plugins")
    }

    #[test]
    fn normalize_collapses_dots_and_duplicate_separators() {
        let base = Path::new("/work");
        assert_eq!(
            normalize_path(Path::new("//usr/share/mcollective/plugins/agent"), base),
            PathBuf::from("/usr/share/mcollective/plugins/agent")
        );
        assert_eq!(
            normalize_path(Path::new("/opt/./stage/../root/x"), base),
            PathBuf::from("/opt/root/x")
        );
        assert_eq!(
            normalize_path(Path::new("stage/plugins"), base),
            PathBuf::from("/work/stage/plugins")
        );
        assert_eq!(normalize_path(Path::new("/../.."), base), PathBuf::from("/"));
    }

    #[test]
    fn destination_concatenates_prefix_and_plugins_path() {
        let tree = sample_tree();
        let registry = scanner::scan(tree.path()).unwrap();
        let mut config = config_for(tree.path(), Path::new("/"));
        let installer = PluginInstaller::new(&config, &registry);
        assert_eq!(
            installer.destination_for(PluginType::Facts),
            PathBuf::from("/usr/share/mcollective/plugins/facts")
        );

        config.prefix = "/tmp/stage".to_string();
        let installer = PluginInstaller::new(&config, &registry);
        assert_eq!(
            installer.destination_for(PluginType::AgentDdl),
            PathBuf::from("/tmp/stage/usr/share/mcollective/plugins/agent")
        );
        assert_eq!(
            installer.plugins_root(),
            PathBuf::from("/tmp/stage/usr/share/mcollective/plugins")
        );
    }

    #[test]
    fn agent_and_ddl_land_in_the_agent_directory() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "agent/foo/agent/foo.rb");
        touch(tree.path(), "agent/foo/agent/foo.ddl");
        let prefix = tempfile::tempdir().unwrap();

        let registry = scanner::scan(tree.path()).unwrap();
        let config = config_for(tree.path(), prefix.path());
        let keys = selector::select(
            &registry,
            &Selection::Explicit(vec!["foo:agent".into(), "foo:agentddl".into()]),
        )
        .unwrap();

        let mut out = Vec::new();
        let summary = PluginInstaller::new(&config, &registry)
            .install_all(&keys, &mut out)
            .unwrap();

        assert_eq!(summary, InstallSummary { plugins: 2, files: 2 });
        assert_eq!(
            installed_files(&plugins_dir(&prefix)),
            vec![PathBuf::from("agent/foo.ddl"), PathBuf::from("agent/foo.rb")]
        );
        assert!(!plugins_dir(&prefix).join("agentddl").exists());
    }

    #[test]
    fn select_all_matches_explicit_full_list() {
        let tree = sample_tree();
        let registry = scanner::scan(tree.path()).unwrap();
        let config = config_for(tree.path(), Path::new("/"));

        let all_prefix = tempfile::tempdir().unwrap();
        let all_config = Configuration {
            prefix: all_prefix.path().display().to_string(),
            ..config.clone()
        };
        let keys = selector::select(&registry, &Selection::All).unwrap();
        PluginInstaller::new(&all_config, &registry)
            .install_all(&keys, &mut io::sink())
            .unwrap();

        let listed: Vec<String> = registry.keys().map(ToString::to_string).collect();
        let explicit_prefix = tempfile::tempdir().unwrap();
        let explicit_config = Configuration {
            prefix: explicit_prefix.path().display().to_string(),
            ..config
        };
        let keys = selector::select(&registry, &Selection::Explicit(listed)).unwrap();
        PluginInstaller::new(&explicit_config, &registry)
            .install_all(&keys, &mut io::sink())
            .unwrap();

        let all_files = installed_files(&plugins_dir(&all_prefix));
        assert_eq!(all_files, installed_files(&plugins_dir(&explicit_prefix)));
        assert!(all_files.contains(&PathBuf::from("authorization/action_policy.rb")));
        assert!(all_files.contains(&PathBuf::from("registration/meta.rb")));
        assert!(all_files.contains(&PathBuf::from("application/puppetd.rb")));
    }

    #[test]
    fn reinstall_overwrites_existing_files() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "security/sshkey/sshkey.rb");
        let prefix = tempfile::tempdir().unwrap();
        let registry = scanner::scan(tree.path()).unwrap();
        let config = config_for(tree.path(), prefix.path());
        let installer = PluginInstaller::new(&config, &registry);
        let keys = selector::select(&registry, &Selection::All).unwrap();

        installer.install_all(&keys, &mut io::sink()).unwrap();
        fs::write(tree.path().join("security/sshkey/sshkey.rb"), "updated").unwrap();
        installer.install_all(&keys, &mut io::sink()).unwrap();

        let installed = plugins_dir(&prefix).join("security/sshkey.rb");
        assert_eq!(fs::read_to_string(installed).unwrap(), "updated");
    }

    #[test]
    fn missing_source_aborts_and_keeps_earlier_installs() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "facts/facter/facter_facts.rb");
        touch(tree.path(), "security/sshkey/sshkey.rb");
        let prefix = tempfile::tempdir().unwrap();
        let registry = scanner::scan(tree.path()).unwrap();
        let config = config_for(tree.path(), prefix.path());
        let keys = selector::select(&registry, &Selection::All).unwrap();

        fs::remove_file(tree.path().join("security/sshkey/sshkey.rb")).unwrap();
        let err = PluginInstaller::new(&config, &registry)
            .install_all(&keys, &mut io::sink())
            .unwrap_err();

        assert!(matches!(err, InstallError::Filesystem { action: "copy", .. }));
        assert_eq!(
            installed_files(&plugins_dir(&prefix)),
            vec![PathBuf::from("facts/facter_facts.rb")]
        );
    }

    #[test]
    fn installing_onto_the_source_tree_leaves_sources_intact() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "registration/meta.rb");
        let registry = scanner::scan(tree.path()).unwrap();
        let config = Configuration {
            plugins_path: String::new(),
            ..config_for(tree.path(), tree.path())
        };
        let key = PluginKey::new("meta", PluginType::Registration);

        let err = PluginInstaller::new(&config, &registry)
            .install(&key, &mut io::sink())
            .unwrap_err();

        assert!(matches!(err, InstallError::Filesystem { action: "copy", .. }));
        assert_eq!(
            fs::read_to_string(tree.path().join("registration/meta.rb")).unwrap(),
            "# registration/meta.rb\n"
        );
    }

    #[test]
    fn progress_lines_name_plugin_sources_and_destination() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "registration/meta.rb");
        let prefix = tempfile::tempdir().unwrap();
        let registry = scanner::scan(tree.path()).unwrap();
        let config = config_for(tree.path(), prefix.path());
        let keys = selector::select(&registry, &Selection::All).unwrap();

        let mut out = Vec::new();
        PluginInstaller::new(&config, &registry)
            .install_all(&keys, &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Installing meta:registration");
        assert_eq!(lines[1], "\tsource: [\"registration/meta.rb\"]");
        assert_eq!(
            lines[2],
            format!(
                "\tdestination: {}",
                plugins_dir(&prefix).join("registration").display()
            )
        );
    }

    #[test]
    fn colored_progress_uses_ansi_codes() {
        let tree = tempfile::tempdir().unwrap();
        touch(tree.path(), "registration/meta.rb");
        let prefix = tempfile::tempdir().unwrap();
        let registry = scanner::scan(tree.path()).unwrap();
        let config = Configuration {
            color: true,
            ..config_for(tree.path(), prefix.path())
        };
        let key = PluginKey::new("meta", PluginType::Registration);

        let mut out = Vec::new();
        PluginInstaller::new(&config, &registry)
            .install(&key, &mut out)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1b[32mInstalling meta:registration\x1b[0m\n"));
    }
}
