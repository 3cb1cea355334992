//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个 destination
//! - destination 的 name / address 非空
//! - address 唯一 (address 是 destination 的身份键)
//! - 1 <= min_packet_num < max_packet_num <= MAX_PACKET_NUM
//! - ping_timeout / ping_interval > 0
//! - worker_pool_size / event_buffer > 0

use std::collections::HashSet;

use contracts::{ContractError, MonitorBlueprint, MAX_PACKET_NUM};

/// 校验 MonitorBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    validate_destinations(blueprint)?;
    validate_unique_addresses(blueprint)?;
    validate_probe_settings(blueprint)?;
    validate_pipeline_settings(blueprint)?;
    Ok(())
}

/// 校验 destination 列表
fn validate_destinations(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    if blueprint.destinations.is_empty() {
        return Err(ContractError::config_validation(
            "destinations",
            "at least one destination is required",
        ));
    }

    for (idx, dest) in blueprint.destinations.iter().enumerate() {
        if dest.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].name", idx),
                "destination name cannot be empty",
            ));
        }
        if dest.address.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("destinations[{}].address", idx),
                "destination address cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验 address 唯一性
fn validate_unique_addresses(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for dest in &blueprint.destinations {
        if !seen.insert(dest.address.as_str()) {
            return Err(ContractError::config_validation(
                format!("destinations[address={}]", dest.address),
                "duplicate destination address",
            ));
        }
    }
    Ok(())
}

/// 校验探测参数
fn validate_probe_settings(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let probe = &blueprint.probe;

    if probe.min_packet_num == 0 {
        return Err(ContractError::config_validation(
            "probe.min_packet_num",
            "min_packet_num must be >= 1",
        ));
    }

    // 区间为 [min, max)，必须非空
    if probe.min_packet_num >= probe.max_packet_num {
        return Err(ContractError::config_validation(
            "probe.min_packet_num / probe.max_packet_num",
            format!(
                "min_packet_num ({}) must be < max_packet_num ({})",
                probe.min_packet_num, probe.max_packet_num
            ),
        ));
    }

    // ICMP 序号为 16 位
    if probe.max_packet_num > MAX_PACKET_NUM {
        return Err(ContractError::config_validation(
            "probe.max_packet_num",
            format!(
                "max_packet_num ({}) must be <= {}",
                probe.max_packet_num, MAX_PACKET_NUM
            ),
        ));
    }

    if probe.ping_timeout == 0 {
        return Err(ContractError::config_validation(
            "probe.ping_timeout",
            "ping_timeout must be > 0",
        ));
    }

    Ok(())
}

/// 校验管道参数
fn validate_pipeline_settings(blueprint: &MonitorBlueprint) -> Result<(), ContractError> {
    let pipeline = &blueprint.pipeline;

    if pipeline.ping_interval == 0 {
        return Err(ContractError::config_validation(
            "pipeline.ping_interval",
            "ping_interval must be > 0",
        ));
    }
    if pipeline.worker_pool_size == 0 {
        return Err(ContractError::config_validation(
            "pipeline.worker_pool_size",
            "worker_pool_size must be > 0",
        ));
    }
    if pipeline.event_buffer == 0 {
        return Err(ContractError::config_validation(
            "pipeline.event_buffer",
            "event_buffer must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, Destination, LoggingConfig, PipelineSettings, ProbeSettings,
    };

    fn minimal_blueprint() -> MonitorBlueprint {
        MonitorBlueprint {
            version: ConfigVersion::V1,
            destinations: vec![
                Destination::new("dns", "1.1.1.1"),
                Destination::new("gateway", "192.168.1.1"),
            ],
            probe: ProbeSettings::default(),
            pipeline: PipelineSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_no_destinations() {
        let mut bp = minimal_blueprint();
        bp.destinations.clear();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one destination"), "got: {err}");
    }

    #[test]
    fn test_duplicate_address() {
        let mut bp = minimal_blueprint();
        bp.destinations.push(Destination::new("dns again", "1.1.1.1"));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate destination address"), "got: {err}");
    }

    #[test]
    fn test_empty_address() {
        let mut bp = minimal_blueprint();
        bp.destinations[0].address = "  ".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("address cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_empty_packet_range() {
        let mut bp = minimal_blueprint();
        bp.probe.min_packet_num = 10;
        bp.probe.max_packet_num = 10;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("must be < max_packet_num"), "got: {err}");
    }

    #[test]
    fn test_packet_num_capped_at_sequence_space() {
        let mut bp = minimal_blueprint();
        bp.probe.max_packet_num = MAX_PACKET_NUM;
        assert!(validate(&bp).is_ok());

        bp.probe.max_packet_num = u32::MAX;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_packet_num (4294967295) must be <= 65536"), "got: {err}");
    }

    #[test]
    fn test_zero_min_packet_num() {
        let mut bp = minimal_blueprint();
        bp.probe.min_packet_num = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains(">= 1"), "got: {err}");
    }

    #[test]
    fn test_zero_worker_pool() {
        let mut bp = minimal_blueprint();
        bp.pipeline.worker_pool_size = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("worker_pool_size"), "got: {err}");
    }

    #[test]
    fn test_zero_interval() {
        let mut bp = minimal_blueprint();
        bp.pipeline.ping_interval = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("ping_interval"), "got: {err}");
    }
}
