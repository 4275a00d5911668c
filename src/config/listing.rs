use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which of the two repository lists is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    #[default]
    Whitelist,
    Blacklist,
}

impl FromStr for ListingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whitelist" => Ok(ListingMode::Whitelist),
            "blacklist" => Ok(ListingMode::Blacklist),
            other => anyhow::bail!("Select can be only 'blacklist' or 'whitelist', got '{}'", other),
        }
    }
}

impl fmt::Display for ListingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListingMode::Whitelist => f.write_str("whitelist"),
            ListingMode::Blacklist => f.write_str("blacklist"),
        }
    }
}

/// Allow/deny policy over repository folder names.
///
/// Only the list named by `mode` is consulted. In whitelist mode an empty
/// whitelist allows nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingPolicy {
    #[serde(rename = "use", default)]
    pub mode: ListingMode,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl ListingPolicy {
    pub fn whitelist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: ListingMode::Whitelist,
            whitelist: names.into_iter().map(Into::into).collect(),
            blacklist: Vec::new(),
        }
    }

    pub fn blacklist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: ListingMode::Blacklist,
            whitelist: Vec::new(),
            blacklist: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, folder_name: &str) -> bool {
        match self.mode {
            ListingMode::Whitelist => self.whitelist.iter().any(|n| n == folder_name),
            ListingMode::Blacklist => !self.blacklist.iter().any(|n| n == folder_name),
        }
    }

    /// Add names to the whitelist, skipping ones already present.
    /// Returns the names that were actually added.
    pub fn add_to_whitelist(&mut self, names: &[String]) -> Vec<String> {
        add_unique(&mut self.whitelist, names)
    }

    pub fn add_to_blacklist(&mut self, names: &[String]) -> Vec<String> {
        add_unique(&mut self.blacklist, names)
    }
}

fn add_unique(list: &mut Vec<String>, names: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for name in names {
        if !list.contains(name) {
            list.push(name.clone());
            added.push(name.clone());
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_mode_only_consults_whitelist() {
        let mut policy = ListingPolicy::whitelist(["core", "lib"]);
        policy.blacklist = vec!["core".to_string()];

        assert!(policy.allows("core"));
        assert!(policy.allows("lib"));
        assert!(!policy.allows("app"));
    }

    #[test]
    fn test_blacklist_mode() {
        let policy = ListingPolicy::blacklist(["app"]);
        assert!(policy.allows("core"));
        assert!(!policy.allows("app"));
    }

    #[test]
    fn test_default_is_empty_whitelist() {
        let policy = ListingPolicy::default();
        assert_eq!(policy.mode, ListingMode::Whitelist);
        assert!(!policy.allows("anything"));
    }

    #[test]
    fn test_add_skips_duplicates() {
        let mut policy = ListingPolicy::whitelist(["core"]);
        let added = policy.add_to_whitelist(&["core".to_string(), "lib".to_string()]);
        assert_eq!(added, vec!["lib"]);
        assert_eq!(policy.whitelist, vec!["core", "lib"]);
    }

    #[test]
    fn test_mode_parse_and_serde() {
        assert_eq!("blacklist".parse::<ListingMode>().unwrap(), ListingMode::Blacklist);
        assert!("greylist".parse::<ListingMode>().is_err());

        let policy: ListingPolicy =
            serde_yaml::from_str("use: blacklist\nblacklist: [old]\n").unwrap();
        assert_eq!(policy.mode, ListingMode::Blacklist);
        assert!(policy.whitelist.is_empty());
        assert!(!policy.allows("old"));
    }
}
