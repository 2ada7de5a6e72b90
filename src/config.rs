//! Configuration file parsing and validation

pub mod machine_toml;

pub use machine_toml::{
    BuildRuleConfig, BuilderConfig, ColorOption, DeployRuleConfig, GoalRuleConfig, GoalSetConfig,
    MachineConfig, MachineMeta, OutputConfig, OutputFormat, ProjectConfig,
};
