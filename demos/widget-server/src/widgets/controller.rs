use crate::widgets::middleware::{AuditTrail, RequireApiKey};
use crate::widgets::model::{CreateWidgetRequest, Widget};
use crate::widgets::store::WidgetStore;
use routecraft::prelude::*;
use serde_json::Value;
use uuid::Uuid;

#[controller(path = "/widgets")]
pub struct WidgetController {
    store: Arc<WidgetStore>,
}

impl WidgetController {
    pub fn new(store: Arc<WidgetStore>) -> Self {
        Self { store }
    }
}

#[routes]
impl WidgetController {
    /// `GET /widgets?price[gt]=5` filters on the first price operator left
    /// by the sanitizer.
    #[get("/")]
    fn list(&self, req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
        let filter = req.query.get("price").and_then(price_filter);
        let widgets: Vec<Widget> = self
            .store
            .list()
            .into_iter()
            .filter(|widget| filter.as_ref().is_none_or(|f| f.matches(widget.price)))
            .collect();
        res.send(ApiResponse::success(widgets))
    }

    #[get("/:id")]
    fn get_one(&self, req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
        let id = widget_id(req)?;
        let widget = self
            .store
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("No widget with id {id}")))?;
        res.send(ApiResponse::success(widget))
    }

    #[post("/")]
    #[validate_body(title: string, price: number)]
    #[use_async(AuditTrail)]
    #[async_handler]
    async fn create(&self, req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
        let body = req.body.take().unwrap_or(Value::Null);
        let request: CreateWidgetRequest = serde_json::from_value(body)
            .map_err(|e| AppError::bad_request(format!("Invalid widget: {e}")))?;
        let widget = self
            .store
            .insert(request)
            .await
            .map_err(|e| AppError::new(e.to_string(), StatusCode::CONFLICT).operational())?;
        tracing::debug!("Created widget {}", widget.id);
        res.send(ApiResponse::success(widget).with_http_status(StatusCode::CREATED))
    }

    #[delete("/:id")]
    #[use_sync(RequireApiKey::from_env())]
    #[async_handler]
    async fn remove(&self, req: &mut HttpRequest, res: &mut HttpResponse, _next: &mut Next) -> Result<(), AppError> {
        let id = widget_id(req)?;
        match self.store.remove(&id).await {
            Some(_) => {
                res.status(StatusCode::NO_CONTENT);
                res.text("");
                Ok(())
            }
            None => Err(AppError::not_found(format!("No widget with id {id}"))),
        }
    }
}

fn widget_id(req: &HttpRequest) -> Result<Uuid, AppError> {
    let raw = req.param("id").unwrap_or_default();
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request(format!("Invalid widget id: {raw}")))
}

struct PriceFilter {
    operator: String,
    bound: f64,
}

impl PriceFilter {
    fn matches(&self, price: f64) -> bool {
        match self.operator.as_str() {
            "gt" => price > self.bound,
            "gte" => price >= self.bound,
            "lt" => price < self.bound,
            "lte" => price <= self.bound,
            "ne" => price != self.bound,
            _ => true,
        }
    }
}

fn price_filter(value: &Value) -> Option<PriceFilter> {
    let (operator, bound) = value.as_object()?.iter().next()?;
    Some(PriceFilter {
        operator: operator.clone(),
        bound: bound.as_str()?.parse().ok()?,
    })
}
