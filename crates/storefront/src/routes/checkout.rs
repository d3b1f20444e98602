//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::routes::cart::CartView;
use crate::routes::{Layout, Shopper};
use crate::services::checkout::{CheckoutError, CheckoutForm, CheckoutService, PAYMENT_METHODS};
use crate::state::AppState;

/// A payment method radio button.
#[derive(Clone)]
pub struct PaymentOption {
    pub value: &'static str,
    pub label: &'static str,
    pub checked: bool,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: CheckoutForm,
    pub payment_methods: Vec<PaymentOption>,
    pub error: Option<String>,
}

fn payment_options(selected: &str) -> Vec<PaymentOption> {
    let selected = if selected.is_empty() {
        PAYMENT_METHODS.first().map_or("", |(value, _)| *value)
    } else {
        selected
    };
    PAYMENT_METHODS
        .iter()
        .map(|&(value, label)| PaymentOption {
            value,
            label,
            checked: value == selected,
        })
        .collect()
}

/// Form prefilled from the logged-in user or the last checkout email.
fn prefilled_form(shopper: &Shopper) -> CheckoutForm {
    match shopper.user() {
        Some(user) => CheckoutForm {
            name: user.name.clone(),
            email: user.email.to_string(),
            phone: user.phone.clone().unwrap_or_default(),
            address: user.address.clone().unwrap_or_default(),
            ..CheckoutForm::default()
        },
        None => CheckoutForm {
            email: shopper.customer_email().unwrap_or_default(),
            ..CheckoutForm::default()
        },
    }
}

async fn render_form(
    mut shopper: Shopper,
    state: &AppState,
    form: CheckoutForm,
    error: Option<String>,
) -> Result<Response> {
    let cart = CartView::new(&shopper.cart(), state);
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    let payment_methods = payment_options(&form.payment_method);
    shopper
        .page(|layout| {
            (
                status,
                CheckoutTemplate {
                    layout,
                    cart,
                    form,
                    payment_methods,
                    error,
                },
            )
                .into_response()
        })
        .await
}

/// Display the checkout form.
///
/// An empty cart, or one with stock problems, goes back to the cart page
/// with the first problem shown.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;
    if !shopper.cart().validate_cart_for_checkout() {
        return shopper.redirect("/cart").await;
    }
    let form = prefilled_form(&shopper);
    render_form(shopper, &state, form, None).await
}

/// Place the order.
#[instrument(skip(state, session, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let mut shopper = Shopper::load(&state, session).await;

    let details = match form.validate() {
        Ok(details) => details,
        Err(e) => return render_form(shopper, &state, form, Some(e.to_string())).await,
    };

    let user = shopper.user();
    let token = shopper.token();
    let result = {
        let mut cart = shopper.cart();
        CheckoutService::new(state.api())
            .submit(&mut cart, &details, user.as_ref(), token.as_deref())
            .await
    };

    match result {
        Ok(order_id) => {
            shopper.set_customer_email(details.email.as_str());
            let id = order_id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", id.as_str())]));
            shopper
                .toaster()
                .success(format!("Order #{order_id} placed successfully"));
            shopper.redirect(&format!("/orders/{order_id}")).await
        }
        Err(CheckoutError::StockRejected(reason)) => {
            // The snapshot was stale; replace it before the visitor shops again.
            if let Err(e) = state.catalog().refresh().await {
                warn!(error = %e, "Catalog refresh after stock rejection failed");
            }
            shopper
                .toaster()
                .error(CheckoutError::StockRejected(reason).to_string());
            shopper.redirect("/cart").await
        }
        Err(e @ (CheckoutError::EmptyCart | CheckoutError::StockIssues(_))) => {
            shopper.toaster().error(e.to_string());
            shopper.redirect("/cart").await
        }
        Err(e @ (CheckoutError::InvalidForm(_) | CheckoutError::Api(_))) => {
            warn!(error = ?e, "Checkout failed");
            render_form(shopper, &state, form, Some(e.to_string())).await
        }
    }
}
