use super::{Middleware, Next};
use crate::exception::AppError;
use crate::http::{HttpRequest, HttpResponse};
use serde_json::{Map, Value};

const OPERATORS: [&str; 5] = ["gt", "gte", "lt", "lte", "ne"];

/// Guards against HTTP parameter pollution in the parsed query.
///
/// - `?sort=a&sort=b` keeps the last value: `{sort: "b"}`
/// - `?price[gt]=5&price[lt]=9` keeps the first operator: `{price: {gt: "5"}}`
/// - objects without a comparison operator are dropped
/// - plain values are kept as they are
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterSanitizer;

impl ParameterSanitizer {
    pub fn new() -> Self {
        Self
    }

    pub fn sanitize(&self, query: Map<String, Value>) -> Map<String, Value> {
        let mut cleaned = Map::new();
        for (key, value) in query {
            match value {
                Value::Array(mut items) => {
                    if let Some(last) = items.pop() {
                        cleaned.insert(key, last);
                    }
                }
                Value::Object(object) => {
                    let operator = object
                        .into_iter()
                        .find(|(id, _)| OPERATORS.contains(&id.as_str()));
                    if let Some((id, item)) = operator {
                        let mut kept = Map::new();
                        kept.insert(id, item);
                        cleaned.insert(key, Value::Object(kept));
                    }
                }
                scalar => {
                    cleaned.insert(key, scalar);
                }
            }
        }
        cleaned
    }
}

impl Middleware for ParameterSanitizer {
    fn handle(&self, req: &mut HttpRequest, _: &mut HttpResponse, next: &mut Next) -> Result<(), AppError> {
        req.query = self.sanitize(std::mem::take(&mut req.query));
        next.proceed();
        Ok(())
    }

    fn name(&self) -> &str {
        "ParameterSanitizer"
    }
}
