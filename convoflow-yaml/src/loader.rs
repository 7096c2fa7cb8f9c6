use crate::validator::{FlowValidator, ValidationReport};
use anyhow::{Context, Result};
use convoflow_core::FlowDefinition;
use std::fs;
use std::path::Path;

/// 流程加载器，支持从文件或字符串加载流程定义
pub struct FlowLoader;

impl FlowLoader {
    /// 从 YAML 文件加载流程
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<FlowDefinition> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read YAML file: {:?}", path.as_ref())
        })?;
        Self::from_yaml_str(&content)
    }

    /// 从 YAML 字符串加载流程
    pub fn from_yaml_str(content: &str) -> Result<FlowDefinition> {
        serde_yaml::from_str(content)
            .with_context(|| "Failed to parse YAML flow definition")
    }

    /// 从 JSON 文件加载流程
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<FlowDefinition> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read JSON file: {:?}", path.as_ref())
        })?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串加载流程
    pub fn from_json_str(content: &str) -> Result<FlowDefinition> {
        serde_json::from_str(content)
            .with_context(|| "Failed to parse JSON flow definition")
    }

    /// 按扩展名选择格式；`.json` 之外一律按 YAML 处理
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FlowDefinition> {
        let is_json = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_yaml_file(path)
        }
    }

    /// 保存流程到 YAML 文件
    pub fn save_to_yaml<P: AsRef<Path>>(
        flow: &FlowDefinition,
        path: P,
    ) -> Result<()> {
        let yaml_content = serde_yaml::to_string(flow)
            .with_context(|| "Failed to serialize flow to YAML")?;

        fs::write(&path, yaml_content).with_context(|| {
            format!("Failed to write YAML file: {:?}", path.as_ref())
        })?;

        Ok(())
    }

    /// 保存流程到 JSON 文件
    pub fn save_to_json<P: AsRef<Path>>(
        flow: &FlowDefinition,
        path: P,
    ) -> Result<()> {
        let json_content = serde_json::to_string_pretty(flow)
            .with_context(|| "Failed to serialize flow to JSON")?;

        fs::write(&path, json_content).with_context(|| {
            format!("Failed to write JSON file: {:?}", path.as_ref())
        })?;

        Ok(())
    }

    /// Lints a loaded flow. Advisory; the driver runs flows that fail it.
    pub fn validate(flow: &FlowDefinition) -> ValidationReport {
        let report = FlowValidator::new(flow).validate();
        for issue in &report.issues {
            tracing::debug!(flow = %flow.id, severity = ?issue.severity, node_id = ?issue.node_id, "{}", issue.message);
        }
        report
    }

    /// Loads a file and fails when validation reports errors.
    pub fn load_checked<P: AsRef<Path>>(path: P) -> Result<FlowDefinition> {
        let flow = Self::from_file(&path)?;
        Self::validate(&flow).into_result().with_context(|| {
            format!("Flow in {:?} failed validation", path.as_ref())
        })?;
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoflow_core::NodeKind;

    const LEAD_FLOW: &str = r#"
id: lead-flow
slug: leads
name: Lead qualification
triggerConfig:
  type: keyword
  keywords: [curso, precio]
variables:
  company: Acme
nodes:
  - id: start
    type: trigger
  - id: hello
    type: message
    content: "Hola, soy el asistente de {{company}}"
  - id: budget
    type: question
    content: "¿Presupuesto?"
    variable: budget
    options:
      - { label: Alto, value: high }
      - { label: Bajo, value: low }
connections:
  - { from: start, to: hello }
  - { from: hello, to: budget }
"#;

    #[test]
    fn test_yaml_and_json_agree() {
        let from_yaml = FlowLoader::from_yaml_str(LEAD_FLOW).unwrap();
        let json = serde_json::to_string(&from_yaml).unwrap();
        let from_json = FlowLoader::from_json_str(&json).unwrap();

        assert_eq!(from_yaml.slug, "leads");
        assert_eq!(from_yaml.nodes.len(), 3);
        assert!(matches!(from_yaml.nodes[2].kind, NodeKind::Question(_)));
        assert_eq!(from_json.nodes, from_yaml.nodes);
        assert_eq!(from_json.connections, from_yaml.connections);
    }

    #[test]
    fn test_parse_error_has_context() {
        let err = FlowLoader::from_yaml_str("nodes: [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML"));

        let err = FlowLoader::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read JSON file"));
    }
}
