use askama::Template;
use axum::{
    response::{Html, IntoResponse, Response},
    http::StatusCode,
};

use crate::domain::CallbackOutcome;

// Make askama templates work with axum
pub struct HtmlTemplate<T>(pub T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            ).into_response(),
        }
    }
}

/// Page returned to the gateway's callback POST. The gateway forwards the
/// shopper's browser here, so the page sends them on to the frontend.
#[derive(Template)]
#[template(path = "payment_redirect.html")]
pub struct PaymentRedirectPage {
    pub outcome: String,
    pub redirect_url: String,
    /// Same URL as a JSON string literal for the inline script.
    pub redirect_url_json: String,
}

impl PaymentRedirectPage {
    pub fn new(frontend_url: &str, outcome: CallbackOutcome, transaction_id: Option<&str>) -> Self {
        let mut redirect_url = format!(
            "{}/payment/{}",
            frontend_url.trim_end_matches('/'),
            outcome.as_str()
        );
        if let Some(tran_id) = transaction_id {
            redirect_url.push_str("?tran_id=");
            redirect_url.push_str(&urlencoding::encode(tran_id));
        }

        // Escape "</" so the literal cannot close the script element
        let redirect_url_json = serde_json::to_string(&redirect_url)
            .unwrap_or_else(|_| "\"/\"".to_string())
            .replace("</", "<\\/");

        Self {
            outcome: outcome.as_str().to_string(),
            redirect_url,
            redirect_url_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_url_encodes_transaction_id() {
        let page = PaymentRedirectPage::new(
            "https://example.org/",
            CallbackOutcome::Fail,
            Some("DON-1 &x=<y>"),
        );
        assert_eq!(
            page.redirect_url,
            "https://example.org/payment/fail?tran_id=DON-1%20%26x%3D%3Cy%3E"
        );
        assert!(page.redirect_url_json.starts_with('"'));
    }

    #[test]
    fn test_redirect_page_renders() {
        let page = PaymentRedirectPage::new("http://localhost:3000", CallbackOutcome::Success, Some("MEM-1"));
        let html = page.render().unwrap();
        assert!(html.contains("Payment success."));
        assert!(html.contains("window.location.replace(\"http://localhost:3000/payment/success?tran_id=MEM-1\")"));
    }
}
