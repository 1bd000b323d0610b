use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// `<type-root>/<name>/...`: the plugin is named after its directory.
static DIRECTORY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+?/(.+?)/").expect("valid directory name regex"));
/// `<type-root>/<name>.rb`: the plugin is named after its file.
static FILE_STEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+?/(.+?)\.rb$").expect("valid file stem regex"));

/// The fixed plugin categories understood by the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginType {
    AgentDdl,
    Agent,
    Application,
    Audit,
    Facts,
    Registration,
    Authorization,
    Security,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::AgentDdl => "agentddl",
            PluginType::Agent => "agent",
            PluginType::Application => "application",
            PluginType::Audit => "audit",
            PluginType::Facts => "facts",
            PluginType::Registration => "registration",
            PluginType::Authorization => "authorization",
            PluginType::Security => "security",
        }
    }

    /// Directory under the plugins path that receives this type's files.
    ///
    /// DDL descriptors live next to their agent implementation.
    pub fn destination_dir(self) -> &'static str {
        match self {
            PluginType::AgentDdl => PluginType::Agent.as_str(),
            other => other.as_str(),
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PLUGIN_TYPES
            .iter()
            .map(|spec| spec.kind)
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown plugin type: {s}"))
    }
}

/// How a plugin name is pulled out of a matched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// First directory below the type root.
    Directory,
    /// File name without the `.rb` extension.
    FileStem,
}

impl NameRule {
    pub fn regex(self) -> &'static Regex {
        match self {
            NameRule::Directory => &DIRECTORY_NAME_RE,
            NameRule::FileStem => &FILE_STEM_RE,
        }
    }

    /// Returns the first capture group for a `/`-separated relative path.
    pub fn extract(self, relative_path: &str) -> Option<&str> {
        self.regex()
            .captures(relative_path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A built-in discovery rule: which files belong to a type and how they are named.
#[derive(Debug)]
pub struct PluginTypeSpec {
    pub kind: PluginType,
    pub dir_globs: &'static [&'static str],
    pub name_rule: NameRule,
}

/// Discovery table, in scan order.
///
/// Tied to the upstream plugin tree layout: files that do not sit where these
/// globs expect are not picked up. `audit/*/audit/*.rb` is known to miss some
/// audit plugins that keep agents alongside them.
pub static PLUGIN_TYPES: [PluginTypeSpec; 8] = [
    PluginTypeSpec {
        kind: PluginType::AgentDdl,
        dir_globs: &["agent/*/agent/*.ddl"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Agent,
        dir_globs: &["agent/*/agent/*.rb"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Application,
        dir_globs: &["agent/*/application/*.rb"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Audit,
        dir_globs: &["audit/*/audit/*.rb"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Facts,
        dir_globs: &["facts/*/*.rb"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Registration,
        dir_globs: &["registration/*.rb"],
        name_rule: NameRule::FileStem,
    },
    PluginTypeSpec {
        kind: PluginType::Authorization,
        dir_globs: &["simplerpc_authorization/*/*.rb"],
        name_rule: NameRule::Directory,
    },
    PluginTypeSpec {
        kind: PluginType::Security,
        dir_globs: &["security/*/*.rb"],
        name_rule: NameRule::Directory,
    },
];
