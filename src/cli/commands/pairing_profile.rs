//! Pairing profile command

use clap::{ArgAction, Args, ValueEnum};

use crate::cli::{ConnectionArgs, StateArg};
use crate::resource::Href;
use crate::resources::{EnforcementMode, KeyLimit, PairingProfile, VisibilityLevel};
use crate::Result;

/// Enforcement mode, as accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum EnforcementModeArg {
    /// The agent does not take control of the host firewall
    #[default]
    Idle,
    /// No traffic is blocked by policy
    VisibilityOnly,
    /// Rules are enforced only for selected inbound services
    Selective,
    /// Rules are enforced for all inbound and outbound services
    Full,
}

impl From<EnforcementModeArg> for EnforcementMode {
    fn from(arg: EnforcementModeArg) -> Self {
        match arg {
            EnforcementModeArg::Idle => EnforcementMode::Idle,
            EnforcementModeArg::VisibilityOnly => EnforcementMode::VisibilityOnly,
            EnforcementModeArg::Selective => EnforcementMode::Selective,
            EnforcementModeArg::Full => EnforcementMode::Full,
        }
    }
}

/// Traffic logging level, as accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum VisibilityLevelArg {
    /// Log connection information for allowed, blocked, and potentially
    /// blocked traffic
    #[default]
    FlowSummary,
    /// Log connection information for blocked and potentially blocked
    /// traffic only
    FlowDrops,
    /// Do not log traffic information
    FlowOff,
    /// Log byte counts in addition to connection details
    EnhancedDataCollection,
}

impl From<VisibilityLevelArg> for VisibilityLevel {
    fn from(arg: VisibilityLevelArg) -> Self {
        match arg {
            VisibilityLevelArg::FlowSummary => VisibilityLevel::FlowSummary,
            VisibilityLevelArg::FlowDrops => VisibilityLevel::FlowDrops,
            VisibilityLevelArg::FlowOff => VisibilityLevel::FlowOff,
            VisibilityLevelArg::EnhancedDataCollection => VisibilityLevel::EnhancedDataCollection,
        }
    }
}

/// Arguments for `segmentctl pairing-profile`
#[derive(Args, Debug)]
pub struct PairingProfileArgs {
    /// Href of an existing pairing profile
    #[arg(long)]
    pub href: Option<String>,

    /// Profile display name; required when no href is given
    #[arg(long)]
    pub name: Option<String>,

    /// Profile description
    #[arg(long, default_value = "")]
    pub description: String,

    /// Desired profile state
    #[arg(long, value_enum, default_value_t = StateArg::Present)]
    pub state: StateArg,

    /// Whether the profile is enabled for pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub enabled: bool,

    /// Default enforcement mode for paired agents
    #[arg(long, value_enum, default_value_t = EnforcementModeArg::Idle)]
    pub enforcement_mode: EnforcementModeArg,

    /// Pass false to allow the enforcement mode to be overridden when
    /// pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub enforcement_mode_lock: bool,

    /// Traffic logging level for paired agents
    #[arg(long, value_enum, default_value_t = VisibilityLevelArg::FlowSummary)]
    pub visibility_level: VisibilityLevelArg,

    /// Pass false to allow the visibility level to be overridden when
    /// pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub visibility_level_lock: bool,

    /// How many times each pairing key can be used: 'unlimited' or a count
    #[arg(long, default_value = "unlimited")]
    pub allowed_uses_per_key: KeyLimit,

    /// How long, in seconds, each pairing key stays valid: 'unlimited' or
    /// a count
    #[arg(long, default_value = "unlimited")]
    pub key_lifespan: KeyLimit,

    /// Agent software release to pin; the engine's library default is used
    /// when unset
    #[arg(long)]
    pub ven_version: Option<String>,

    /// Default label to apply to paired workloads, by href; repeatable,
    /// order is preserved
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Pass false to allow the role label to be overridden when pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub role_label_lock: bool,

    /// Pass false to allow the app label to be overridden when pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub app_label_lock: bool,

    /// Pass false to allow the environment label to be overridden when
    /// pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub env_label_lock: bool,

    /// Pass false to allow the location label to be overridden when pairing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub loc_label_lock: bool,

    /// External data set identifier; requires --external-data-reference
    #[arg(long)]
    pub external_data_set: Option<String>,

    /// External data reference identifier; requires --external-data-set
    #[arg(long)]
    pub external_data_reference: Option<String>,
}

/// Reconcile one pairing profile
pub async fn run(conn: &ConnectionArgs, args: PairingProfileArgs, dry_run: bool) -> Result<()> {
    let desired = PairingProfile {
        name: args.name,
        description: args.description,
        enabled: args.enabled,
        enforcement_mode: args.enforcement_mode.into(),
        enforcement_mode_lock: args.enforcement_mode_lock,
        visibility_level: args.visibility_level.into(),
        visibility_level_lock: args.visibility_level_lock,
        allowed_uses_per_key: args.allowed_uses_per_key,
        key_lifespan: args.key_lifespan,
        agent_software_release: args.ven_version,
        labels: args.labels.into_iter().map(Href::new).collect(),
        role_label_lock: args.role_label_lock,
        app_label_lock: args.app_label_lock,
        env_label_lock: args.env_label_lock,
        loc_label_lock: args.loc_label_lock,
        external_data_set: args.external_data_set,
        external_data_reference: args.external_data_reference,
        ..Default::default()
    };
    super::execute(conn, args.href, args.state, desired, dry_run).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_map_onto_engine_wire_values() {
        let mode: EnforcementMode = EnforcementModeArg::VisibilityOnly.into();
        assert_eq!(
            serde_json::to_value(mode).unwrap(),
            serde_json::json!("visibility_only")
        );
        let level: VisibilityLevel = VisibilityLevelArg::EnhancedDataCollection.into();
        assert_eq!(
            serde_json::to_value(level).unwrap(),
            serde_json::json!("enhanced_data_collection")
        );
    }
}
