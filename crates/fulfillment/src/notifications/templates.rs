//! Status-change message rendering.
//!
//! One canned copy block per destination status, rendered into a
//! multipart email (Askama templates) and a short chat message. Statuses
//! without dedicated copy fall back to a generic update.

use askama::Template;
use jabuticaba_core::OrderStatus;

use crate::models::OrderSummary;

#[derive(Template)]
#[template(path = "email/status_update.html")]
struct StatusEmailHtml<'a> {
    customer_name: &'a str,
    headline: &'a str,
    detail: &'a str,
    order_number: String,
    total: String,
    tracking_code: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "email/status_update.txt")]
struct StatusEmailText<'a> {
    customer_name: &'a str,
    headline: &'a str,
    detail: &'a str,
    order_number: String,
    total: String,
    tracking_code: Option<&'a str>,
}

/// Everything the dispatcher needs to render messages for one transition.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    /// Customer name for the greeting.
    pub customer_name: &'a str,
    /// Order facts referenced by the copy.
    pub order: &'a OrderSummary,
}

/// Rendered message bodies for one status transition.
#[derive(Debug, Clone)]
pub struct RenderedMessages {
    /// Email subject line.
    pub subject: String,
    /// Email HTML body.
    pub html: String,
    /// Email plain-text body.
    pub text: String,
    /// Short chat message.
    pub chat: String,
}

struct Copy {
    subject: &'static str,
    headline: &'static str,
    detail: &'static str,
}

/// Brazilian currency formatting: decimal comma, two places.
fn format_brl(amount: rust_decimal::Decimal) -> String {
    format!("R$ {amount:.2}").replace('.', ",")
}

fn copy_for(status: OrderStatus) -> Copy {
    match status {
        OrderStatus::Processing => Copy {
            subject: "Recebemos o seu pedido",
            headline: "Pedido recebido!",
            detail: "Seu pedido foi recebido e está aguardando a confirmação do pagamento.",
        },
        OrderStatus::Confirmed => Copy {
            subject: "Pagamento confirmado",
            headline: "Pagamento confirmado!",
            detail: "O pagamento foi aprovado e seu pedido já está sendo preparado.",
        },
        OrderStatus::Shipped => Copy {
            subject: "Seu pedido foi enviado",
            headline: "Pedido a caminho!",
            detail: "Seu pedido saiu para entrega.",
        },
        OrderStatus::Delivered => Copy {
            subject: "Pedido entregue",
            headline: "Pedido entregue!",
            detail: "Seu pedido foi entregue. Esperamos que aproveite!",
        },
        OrderStatus::Cancelled => Copy {
            subject: "Pedido cancelado",
            headline: "Pedido cancelado",
            detail: "Seu pedido foi cancelado. Se você não solicitou o cancelamento, fale com a gente.",
        },
        // Generic fallback for transitions without dedicated copy.
        _ => Copy {
            subject: "Atualização do seu pedido",
            headline: "Atualização do pedido",
            detail: "O status do seu pedido mudou.",
        },
    }
}

/// Render the email and chat messages for a status transition.
///
/// # Errors
///
/// Returns [`askama::Error`] if template rendering fails.
pub fn render(
    new_status: OrderStatus,
    ctx: &MessageContext<'_>,
) -> Result<RenderedMessages, askama::Error> {
    let copy = copy_for(new_status);
    let order_number = ctx.order.order_id.to_string();
    let total = format_brl(ctx.order.total);
    let tracking_code = ctx.order.tracking_code.as_deref();

    let html = StatusEmailHtml {
        customer_name: ctx.customer_name,
        headline: copy.headline,
        detail: copy.detail,
        order_number: order_number.clone(),
        total: total.clone(),
        tracking_code,
    }
    .render()?;

    let text = StatusEmailText {
        customer_name: ctx.customer_name,
        headline: copy.headline,
        detail: copy.detail,
        order_number: order_number.clone(),
        total: total.clone(),
        tracking_code,
    }
    .render()?;

    let mut chat = format!(
        "Olá, {}! {} Pedido #{} (total {}). {}",
        ctx.customer_name, copy.headline, order_number, total, copy.detail,
    );
    if let Some(code) = tracking_code {
        chat.push_str(&format!(" Código de rastreio: {code}"));
    }

    Ok(RenderedMessages {
        subject: format!("{} - Pedido #{}", copy.subject, order_number),
        html,
        text,
        chat,
    })
}
