//! Builtin Tools
//!
//! 기본 제공 도구 모음과 조립 함수. 각 도구는 `*_spec()` 함수로
//! `ToolSpec`을 내보내고, `register_builtins`가 설정에 따라 한 번에
//! 등록합니다.

pub mod doc_search;
pub mod fetch_page;
pub mod fs;
pub mod kiwix;
pub mod shell;
pub mod time;
pub mod web_search;

use crate::gate::ProviderGate;
use crate::registry::ToolRegistry;
use driftwood_foundation::{Result, SearchConfig};

pub use doc_search::{DocSearchTool, HttpRetriever, Passage, Retriever};
pub use fetch_page::FetchPageTool;
pub use web_search::{SearchHit, WebSearchTool};

/// 기본 도구 전체 등록
///
/// 검색 계열 도구는 설정이 없어도 등록됩니다 - 실행 시점에
/// `dependency_missing`으로 보고하는 쪽이 모델 입장에서 도구가
/// 사라지는 것보다 진단하기 쉽습니다.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    search: &SearchConfig,
    gate: &ProviderGate,
) -> Result<()> {
    registry.register(time::get_time_spec())?;
    registry.register(web_search::web_search_spec(
        search.searx_url.clone(),
        gate.clone(),
    ))?;
    registry.register(doc_search::doc_search_spec(search.retriever_url.clone()))?;
    registry.register(kiwix::kiwix_search_spec(
        search.kiwix_url.clone(),
        gate.clone(),
    ))?;
    registry.register(fetch_page::fetch_page_spec())?;
    registry.register(fs::read_file_spec())?;
    registry.register(shell::shell_spec())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtins_complete() {
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &SearchConfig::default(), &ProviderGate::default())
            .unwrap();

        for name in [
            "get_time",
            "web_search",
            "doc_search",
            "kiwix_search",
            "fetch_page",
            "read_file",
            "shell",
        ] {
            assert!(registry.contains(name), "missing builtin: {}", name);
        }

        // shell만 확인을 요구
        let gated: Vec<_> = registry
            .iter()
            .filter(|t| t.spec.requires_confirmation)
            .map(|t| t.spec.name.clone())
            .collect();
        assert_eq!(gated, vec!["shell"]);
    }
}
