//! Tool Registry - 이름 기반 도구 레지스트리
//!
//! 등록 순서를 보존하며, 같은 이름의 재등록은 거부합니다.
//! 모델에 노출할 JSON-Schema는 등록 시점에 한 번 렌더링해 캐시합니다.

use crate::spec::ToolSpec;
use driftwood_foundation::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// 등록된 도구 + 캐시된 스키마
pub struct RegisteredTool {
    pub spec: ToolSpec,

    /// 등록 시점에 렌더링된 `type`/`properties`/`required` 객체
    pub parameters: Value,
}

/// 도구 레지스트리
///
/// 조립 시점에 채워지고 이후 읽기 전용으로 공유됩니다 (`Arc`).
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<RegisteredTool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 도구 등록
    ///
    /// 이미 같은 이름이 있으면 에러를 반환하고 레지스트리는 변경되지
    /// 않습니다 - 조용히 덮어쓰면 어느 핸들러가 실행될지 불투명해집니다.
    pub fn register(&mut self, spec: ToolSpec) -> Result<()> {
        if self.by_name.contains_key(&spec.name) {
            return Err(Error::DuplicateTool(spec.name));
        }

        let parameters = spec.args.to_parameters();
        let name = spec.name.clone();
        tracing::debug!(tool = %name, "Registered tool");

        self.tools.push(Arc::new(RegisteredTool { spec, parameters }));
        self.by_name.insert(name, self.tools.len() - 1);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredTool>> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 등록 순서대로 전체 도구 순회
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredTool>> {
        self.tools.iter()
    }

    /// 활성화된 도구만 등록 순서대로
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<RegisteredTool>> {
        self.tools.iter().filter(|t| t.spec.enabled)
    }

    /// 모델에 광고할 (name, description, parameters) 목록
    ///
    /// parameters는 캐시된 값의 clone입니다 - 재렌더링하지 않습니다.
    pub fn declarations(&self) -> Vec<(String, String, Value)> {
        self.enabled()
            .map(|t| {
                (
                    t.spec.name.clone(),
                    t.spec.description.clone(),
                    t.parameters.clone(),
                )
            })
            .collect()
    }
}
