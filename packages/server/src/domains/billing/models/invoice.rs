use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use super::credit_card::CreditCard;
use crate::common::{InvoiceId, UserId};
use crate::kernel::GatewayInvoice;

/// How many past invoices billing history returns
pub const BILLING_HISTORY_LIMIT: i64 = 12;

/// A billed invoice with the card it was charged to frozen in place.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(skip)]
    pub user_id: UserId,
    pub plan: Option<String>,
    pub receipt_number: Option<String>,
    pub description: Option<String>,
    pub period_start_on: Option<NaiveDate>,
    pub period_end_on: Option<NaiveDate>,
    pub currency: Option<String>,
    pub tax: Option<i64>,
    pub tax_percent: Option<f64>,
    pub total: i64,
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_date: Option<NaiveDate>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Invoice fields read from a gateway invoice event
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInvoice {
    /// Gateway customer the invoice belongs to
    pub payment_id: String,
    pub plan: Option<String>,
    pub receipt_number: Option<String>,
    pub description: Option<String>,
    pub period_start_on: Option<NaiveDate>,
    pub period_end_on: Option<NaiveDate>,
    pub currency: Option<String>,
    pub tax: Option<i64>,
    pub tax_percent: Option<f64>,
    pub total: i64,
}

fn utc_date(timestamp: Option<i64>) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp?, 0).map(|dt| dt.date_naive())
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(String::from)
}

impl ParsedInvoice {
    /// Read an invoice from the `data.object` of a gateway event.
    ///
    /// Plan and billing period come from the first line item.
    pub fn from_event_object(invoice: &Value) -> Result<Self> {
        let payment_id = string_at(invoice, "/customer").context("invoice has no customer")?;
        let line = invoice
            .pointer("/lines/data/0")
            .context("invoice has no line items")?;

        Ok(Self {
            payment_id,
            plan: string_at(line, "/plan/name").or_else(|| string_at(line, "/plan/nickname")),
            receipt_number: string_at(invoice, "/receipt_number"),
            description: string_at(line, "/plan/statement_descriptor"),
            period_start_on: utc_date(line.pointer("/period/start").and_then(Value::as_i64)),
            period_end_on: utc_date(line.pointer("/period/end").and_then(Value::as_i64)),
            currency: string_at(invoice, "/currency"),
            tax: invoice.get("tax").and_then(Value::as_i64),
            tax_percent: invoice.get("tax_percent").and_then(Value::as_f64),
            total: invoice.get("total").and_then(Value::as_i64).unwrap_or(0),
        })
    }
}

/// Next invoice the gateway will bill, shaped for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingInvoice {
    pub plan: Option<String>,
    pub description: Option<String>,
    pub next_bill_on: Option<DateTime<Utc>>,
    pub amount_due: i64,
    pub interval: Option<String>,
}

impl From<GatewayInvoice> for UpcomingInvoice {
    fn from(invoice: GatewayInvoice) -> Self {
        let plan = invoice.plan;
        Self {
            plan: plan.as_ref().and_then(|p| p.name.clone()),
            description: plan.as_ref().and_then(|p| p.statement_descriptor.clone()),
            next_bill_on: invoice.date.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            amount_due: invoice.amount_due,
            interval: plan.and_then(|p| p.interval),
        }
    }
}

impl Invoice {
    /// Persist a parsed invoice with a snapshot of the card on file.
    pub async fn create(
        user_id: UserId,
        parsed: &ParsedInvoice,
        card: &CreditCard,
        pool: &PgPool,
    ) -> Result<Self> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                id, user_id, plan, receipt_number, description,
                period_start_on, period_end_on, currency, tax, tax_percent, total,
                brand, last4, exp_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(InvoiceId::new())
        .bind(user_id)
        .bind(&parsed.plan)
        .bind(&parsed.receipt_number)
        .bind(&parsed.description)
        .bind(parsed.period_start_on)
        .bind(parsed.period_end_on)
        .bind(&parsed.currency)
        .bind(parsed.tax)
        .bind(parsed.tax_percent)
        .bind(parsed.total)
        .bind(&card.brand)
        .bind(&card.last4)
        .bind(card.exp_date)
        .fetch_one(pool)
        .await?;
        Ok(invoice)
    }

    /// Most recent invoices first
    pub async fn billing_history(user_id: UserId, pool: &PgPool) -> Result<Vec<Self>> {
        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT * FROM invoices
            WHERE user_id = $1
            ORDER BY created_on DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(BILLING_HISTORY_LIMIT)
        .fetch_all(pool)
        .await?;
        Ok(invoices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::GatewayPlan;
    use serde_json::json;

    fn invoice_object() -> Value {
        json!({
            "id": "in_000",
            "object": "invoice",
            "customer": "cus_000",
            "currency": "usd",
            "total": 500,
            "tax": null,
            "tax_percent": null,
            "receipt_number": "0009000",
            "lines": {
                "data": [{
                    "id": "sub_000",
                    "type": "subscription",
                    "period": { "start": 1433162255, "end": 1434371855 },
                    "plan": {
                        "id": "gold",
                        "name": "Gold",
                        "interval": "month",
                        "statement_descriptor": "GOLD MONTHLY"
                    }
                }]
            }
        })
    }

    #[test]
    fn parses_invoice_event_object() {
        let parsed = ParsedInvoice::from_event_object(&invoice_object()).unwrap();

        assert_eq!(parsed.payment_id, "cus_000");
        assert_eq!(parsed.plan.as_deref(), Some("Gold"));
        assert_eq!(parsed.receipt_number.as_deref(), Some("0009000"));
        assert_eq!(parsed.description.as_deref(), Some("GOLD MONTHLY"));
        assert_eq!(parsed.period_start_on, NaiveDate::from_ymd_opt(2015, 6, 1));
        assert_eq!(parsed.period_end_on, NaiveDate::from_ymd_opt(2015, 6, 15));
        assert_eq!(parsed.currency.as_deref(), Some("usd"));
        assert_eq!(parsed.tax, None);
        assert_eq!(parsed.tax_percent, None);
        assert_eq!(parsed.total, 500);
    }

    #[test]
    fn invoice_without_customer_is_rejected() {
        let mut object = invoice_object();
        object.as_object_mut().unwrap().remove("customer");
        assert!(ParsedInvoice::from_event_object(&object).is_err());
    }

    #[test]
    fn upcoming_invoice_from_gateway() {
        let upcoming = UpcomingInvoice::from(GatewayInvoice {
            date: Some(1433018770),
            amount_due: 500,
            plan: Some(GatewayPlan {
                id: "gold".into(),
                name: Some("Gold".into()),
                statement_descriptor: Some("GOLD MONTHLY".into()),
                interval: Some("month".into()),
            }),
        });

        assert_eq!(upcoming.plan.as_deref(), Some("Gold"));
        assert_eq!(upcoming.description.as_deref(), Some("GOLD MONTHLY"));
        assert_eq!(
            upcoming.next_bill_on.unwrap().to_rfc3339(),
            "2015-05-30T20:46:10+00:00"
        );
        assert_eq!(upcoming.amount_due, 500);
        assert_eq!(upcoming.interval.as_deref(), Some("month"));
    }
}
