use super::{RestoreCategory, RestoreEngine};
use crate::backup::BackupInfo;
use crate::probes::BundleStats;

/// What a backup holds for one restorable category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    /// The category.
    pub category: RestoreCategory,
    /// Number of items; zero means nothing to restore.
    pub count: usize,
}

impl CategorySummary {
    const fn command(&self) -> &'static str {
        match self.category {
            RestoreCategory::StoreApps => "appstore",
            RestoreCategory::PackageBundle => "homebrew",
            RestoreCategory::Fonts => "fonts",
            RestoreCategory::Configs => "configs",
        }
    }

    const fn unit(&self) -> &'static str {
        match self.category {
            RestoreCategory::StoreApps => "App Store applications",
            RestoreCategory::PackageBundle => "Brewfile entries",
            RestoreCategory::Fonts => "custom fonts",
            RestoreCategory::Configs => "config files",
        }
    }
}

/// Overview of a backup's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Metadata recorded at backup time.
    pub info: BackupInfo,
    /// One entry per restorable category, in `restore all` order.
    pub categories: Vec<CategorySummary>,
    /// Manually installed apps, which must be reinstalled by hand.
    pub manual_apps: Vec<String>,
}

impl RestoreSummary {
    /// Render the summary as display lines.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let or_unknown = |s: &str| {
            if s.is_empty() {
                "Unknown".to_string()
            } else {
                s.to_string()
            }
        };
        let mut lines = vec![
            format!("Backup Date: {}", or_unknown(&self.info.date)),
            format!("macOS Version: {}", or_unknown(&self.info.macos_version)),
            format!("macbac Version: {}", or_unknown(&self.info.macbac_version)),
            String::new(),
            "Available restore categories:".to_string(),
        ];
        for entry in &self.categories {
            if entry.count == 0 {
                lines.push(format!("  {:<9} - nothing to restore", entry.command()));
            } else {
                lines.push(format!(
                    "  {:<9} - {} {}",
                    entry.command(),
                    entry.count,
                    entry.unit()
                ));
            }
        }
        if !self.manual_apps.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "Manually installed applications ({}, reinstall by hand):",
                self.manual_apps.len()
            ));
            lines.extend(self.manual_apps.iter().map(|name| format!("  {name}")));
        }
        lines.push(String::new());
        lines.push(
            "Use 'macbac restore --source <backup_dir> <category>' to restore specific categories."
                .to_string(),
        );
        lines
    }
}

impl RestoreEngine {
    /// Summarise the backup without touching the system.
    #[must_use]
    pub fn summary(&self) -> RestoreSummary {
        let m = &self.manifest;
        let categories = RestoreCategory::ALL
            .iter()
            .map(|&category| CategorySummary {
                category,
                count: match category {
                    RestoreCategory::StoreApps => m.store_apps.len(),
                    RestoreCategory::PackageBundle => {
                        BundleStats::from_text(&m.package_bundle.raw_bundle_text).total_lines
                    }
                    RestoreCategory::Fonts => m.fonts.len(),
                    RestoreCategory::Configs => m.config_files.len(),
                },
            })
            .collect();
        RestoreSummary {
            info: m.backup_info.clone(),
            categories,
            manual_apps: m.manual_apps.iter().map(|a| a.name.clone()).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backup::build_manifest;
    use crate::backup::manifest::Manifest;
    use crate::backup::test_support::sample_run;
    use crate::restore::tests::engine_with;

    #[test]
    fn counts_every_category() {
        let (engine, _dir) = engine_with(&build_manifest(&sample_run()));
        let summary = engine.summary();
        let counts: Vec<usize> = summary.categories.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![1, 1, 2, 1]);
        assert_eq!(summary.manual_apps, vec!["Tool"]);
        assert_eq!(summary.info.macos_version, "14.4.1");
    }

    #[test]
    fn empty_backup_renders_nothing_to_restore() {
        let (engine, _dir) = engine_with(&Manifest::default());
        let lines = engine.summary().render();
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.ends_with("nothing to restore"))
                .count(),
            4
        );
        assert!(lines.contains(&"Backup Date: Unknown".to_string()));
    }

    #[test]
    fn render_is_repeatable() {
        let (engine, _dir) = engine_with(&build_manifest(&sample_run()));
        let summary = engine.summary();
        let first = summary.render();
        assert_eq!(first, summary.render());
        assert_eq!(engine.summary(), summary);
        assert!(first.iter().any(|l| l == "  appstore  - 1 App Store applications"));
        assert!(first.iter().any(|l| l == "  fonts     - 2 custom fonts"));
        assert!(first.iter().any(|l| l == "  Tool"));
    }
}
