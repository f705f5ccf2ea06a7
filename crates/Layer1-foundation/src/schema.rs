//! Argument Schema - 도구 인자 스키마 정의 및 검증
//!
//! 각 도구는 등록 시점에 정적 스키마를 선언합니다. 런타임은 핸들러를
//! 호출하기 전에 모델이 보낸 원시 인자를 이 스키마로 검증합니다.
//!
//! JSON-Schema를 런타임에 재유도하지 않습니다 - `to_parameters()`가
//! 렌더링한 결과를 레지스트리가 등록 시점에 한 번 캐시합니다.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ============================================================================
// ArgType - 인자 타입
// ============================================================================

/// 인자 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ArgType {
    fn json_name(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::Array => "array",
            ArgType::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Integer => value.is_i64() || value.is_u64(),
            // integer는 number로도 유효
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Array => value.is_array(),
            ArgType::Object => value.is_object(),
        }
    }
}

// ============================================================================
// ArgField / ArgSchema
// ============================================================================

/// 단일 인자 필드 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgField {
    pub name: String,
    pub arg_type: ArgType,
    pub description: String,

    /// 필수 여부
    #[serde(default)]
    pub required: bool,

    /// 숫자 하한 (integer/number만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// 숫자 상한 (integer/number만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// 허용 값 목록 (string만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

/// 도구 인자 스키마
///
/// ## 사용법
/// ```
/// use driftwood_foundation::schema::ArgSchema;
///
/// let schema = ArgSchema::new()
///     .string("query", "The search query", true)
///     .integer("max_results", "Maximum results", false);
///
/// assert!(schema.validate(&serde_json::json!({"query": "hi"})).is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgSchema {
    pub fields: Vec<ArgField>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// 필드 없는 스키마 (인자 없는 도구용)
    pub fn empty() -> Self {
        Self::new()
    }

    pub fn field(mut self, field: ArgField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn string(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.typed(name, ArgType::String, description, required)
    }

    pub fn integer(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.typed(name, ArgType::Integer, description, required)
    }

    pub fn boolean(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.typed(name, ArgType::Boolean, description, required)
    }

    pub fn typed(
        mut self,
        name: impl Into<String>,
        arg_type: ArgType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.fields.push(ArgField {
            name: name.into(),
            arg_type,
            description: description.into(),
            required,
            minimum: None,
            maximum: None,
            enum_values: None,
        });
        self
    }

    /// 마지막 필드에 숫자 범위 추가
    pub fn bounded(mut self, minimum: f64, maximum: f64) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.minimum = Some(minimum);
            last.maximum = Some(maximum);
        }
        self
    }

    /// 마지막 필드에 enum 값 추가
    pub fn one_of(mut self, values: Vec<&str>) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.enum_values = Some(values.into_iter().map(String::from).collect());
        }
        self
    }

    /// 인자 검증
    ///
    /// 실패 시 위반 목록을 반환합니다 (필수 필드 누락, 타입 불일치,
    /// 범위 초과, enum 위반). 런타임이 이 목록을 `meta.detail`에 넣습니다.
    pub fn validate(&self, args: &Value) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        let map = match args.as_object() {
            Some(m) => m,
            None => {
                return Err(vec![format!("arguments must be an object, got {}", type_name(args))]);
            }
        };

        for field in &self.fields {
            match map.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        violations.push(format!("missing required field: {}", field.name));
                    }
                }
                Some(value) => {
                    if !field.arg_type.matches(value) {
                        violations.push(format!(
                            "field {}: expected {}, got {}",
                            field.name,
                            field.arg_type.json_name(),
                            type_name(value)
                        ));
                        continue;
                    }

                    if let Some(n) = value.as_f64() {
                        if let Some(min) = field.minimum {
                            if n < min {
                                violations
                                    .push(format!("field {}: {} below minimum {}", field.name, n, min));
                            }
                        }
                        if let Some(max) = field.maximum {
                            if n > max {
                                violations
                                    .push(format!("field {}: {} above maximum {}", field.name, n, max));
                            }
                        }
                    }

                    if let (Some(allowed), Some(s)) = (&field.enum_values, value.as_str()) {
                        if !allowed.iter().any(|a| a == s) {
                            violations.push(format!(
                                "field {}: '{}' not one of {:?}",
                                field.name, s, allowed
                            ));
                        }
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// 모델에 노출할 JSON-Schema 형태로 렌더링
    ///
    /// 항상 `type`/`properties`/`required`만 사용하는 평탄한 형태입니다.
    /// 레지스트리가 등록 시점에 한 번 호출하고 캐시합니다.
    pub fn to_parameters(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(field.arg_type.json_name()));
            prop.insert("description".into(), json!(field.description));
            if let Some(min) = field.minimum {
                prop.insert("minimum".into(), json!(min));
            }
            if let Some(max) = field.maximum {
                prop.insert("maximum".into(), json!(max));
            }
            if let Some(values) = &field.enum_values {
                prop.insert("enum".into(), json!(values));
            }
            properties.insert(field.name.clone(), Value::Object(prop));

            if field.required {
                required.push(field.name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Schema Sanitization - 모델 노출용 스키마 정리
// ============================================================================

/// 외부 스키마를 모델 노출용으로 정리
///
/// 많은 모델의 tool-calling 구현이 `$ref`를 해석하지 못합니다.
/// `$ref`는 문서 내 `definitions`/`$defs`에서 인라인으로 풀고,
/// `anyOf`/`oneOf`는 첫 번째 구체적인 variant로 평탄화합니다.
/// MCP 등 외부에서 들어온 스키마에 사용합니다.
pub fn sanitize_schema(schema: &Value) -> Value {
    let defs = collect_definitions(schema);
    sanitize_node(schema, &defs, 0)
}

fn collect_definitions(root: &Value) -> Map<String, Value> {
    let mut defs = Map::new();
    for key in ["definitions", "$defs"] {
        if let Some(map) = root.get(key).and_then(|v| v.as_object()) {
            for (name, value) in map {
                defs.insert(format!("#/{}/{}", key, name), value.clone());
            }
        }
    }
    defs
}

fn sanitize_node(node: &Value, defs: &Map<String, Value>, depth: usize) -> Value {
    // 순환 참조 방지
    if depth > 16 {
        return json!({"type": "string"});
    }

    let obj = match node.as_object() {
        Some(o) => o,
        None => return node.clone(),
    };

    // $ref 인라인
    if let Some(reference) = obj.get("$ref").and_then(|v| v.as_str()) {
        return match defs.get(reference) {
            Some(target) => sanitize_node(target, defs, depth + 1),
            None => json!({"type": "string"}),
        };
    }

    // anyOf/oneOf는 첫 번째 구체적인 variant로 평탄화
    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = obj.get(key).and_then(|v| v.as_array()) {
            let concrete = variants
                .iter()
                .find(|v| v.get("type").map(|t| t != "null").unwrap_or(false))
                .or_else(|| variants.first());
            if let Some(v) = concrete {
                return sanitize_node(v, defs, depth + 1);
            }
        }
    }

    // 허용된 키만 유지, 하위 스키마는 재귀 정리
    let mut out = Map::new();
    for (key, value) in obj {
        match key.as_str() {
            "type" | "description" | "enum" | "required" | "default" | "minimum" | "maximum" => {
                out.insert(key.clone(), value.clone());
            }
            "properties" => {
                let props = value
                    .as_object()
                    .map(|m| {
                        m.iter()
                            .map(|(k, v)| (k.clone(), sanitize_node(v, defs, depth + 1)))
                            .collect::<Map<_, _>>()
                    })
                    .unwrap_or_default();
                out.insert("properties".into(), Value::Object(props));
            }
            "items" => {
                out.insert("items".into(), sanitize_node(value, defs, depth + 1));
            }
            _ => {}
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_schema() -> ArgSchema {
        ArgSchema::new()
            .string("query", "The search query", true)
            .integer("max_results", "Maximum results", false)
            .bounded(1.0, 50.0)
    }

    #[test]
    fn test_validate_ok() {
        let schema = search_schema();
        assert!(schema.validate(&json!({"query": "rust", "max_results": 5})).is_ok());
        assert!(schema.validate(&json!({"query": "rust"})).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let schema = search_schema();
        let err = schema.validate(&json!({})).unwrap_err();
        assert_eq!(err, vec!["missing required field: query"]);
    }

    #[test]
    fn test_validate_wrong_type() {
        let schema = search_schema();
        let err = schema.validate(&json!({"query": 42})).unwrap_err();
        assert!(err[0].contains("expected string"));
    }

    #[test]
    fn test_validate_out_of_bounds() {
        let schema = search_schema();
        let err = schema
            .validate(&json!({"query": "x", "max_results": 500}))
            .unwrap_err();
        assert!(err[0].contains("above maximum"));
    }

    #[test]
    fn test_validate_enum() {
        let schema = ArgSchema::new()
            .string("mode", "Search mode", true)
            .one_of(vec!["web", "news"]);
        assert!(schema.validate(&json!({"mode": "web"})).is_ok());
        assert!(schema.validate(&json!({"mode": "maps"})).is_err());
    }

    #[test]
    fn test_validate_non_object() {
        let schema = search_schema();
        let err = schema.validate(&json!("not an object")).unwrap_err();
        assert!(err[0].contains("must be an object"));
    }

    #[test]
    fn test_to_parameters_shape() {
        let params = search_schema().to_parameters();
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["query"]["type"], "string");
        assert_eq!(params["properties"]["max_results"]["maximum"], 50.0);
        assert_eq!(params["required"], json!(["query"]));
    }

    #[test]
    fn test_sanitize_ref_inlined() {
        let schema = json!({
            "type": "object",
            "properties": {
                "filter": {"$ref": "#/definitions/Filter"}
            },
            "definitions": {
                "Filter": {"type": "string", "enum": ["a", "b"]}
            }
        });
        let clean = sanitize_schema(&schema);
        assert_eq!(clean["properties"]["filter"]["type"], "string");
        assert_eq!(clean["properties"]["filter"]["enum"], json!(["a", "b"]));
        assert!(clean.get("definitions").is_none());
    }

    #[test]
    fn test_sanitize_any_of_flattened() {
        let schema = json!({
            "type": "object",
            "properties": {
                "limit": {"anyOf": [{"type": "null"}, {"type": "integer"}]}
            }
        });
        let clean = sanitize_schema(&schema);
        assert_eq!(clean["properties"]["limit"]["type"], "integer");
    }

    #[test]
    fn test_sanitize_unknown_ref_degrades_to_string() {
        let schema = json!({"$ref": "#/definitions/Missing"});
        assert_eq!(sanitize_schema(&schema), json!({"type": "string"}));
    }
}
