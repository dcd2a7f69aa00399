//! Invoice total calculation.
//!
//! All amounts are in the smallest currency unit. Discounts and taxes are
//! computed per line, then summed, so rounding happens once per line.

use serde::{Deserialize, Serialize};

use cargohub_core::{DomainError, DomainResult, Rate};

/// Per-line discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Discount {
    #[default]
    None,
    /// Share of the line subtotal.
    Percent(Rate),
    /// Fixed amount off the line subtotal.
    Amount(u64),
}

/// A billable line as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default)]
    pub tax_rate: Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub subtotal: u64,
    pub discount: u64,
    pub taxable: u64,
    pub tax: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub lines: Vec<LineTotals>,
    pub subtotal: u64,
    pub discount_total: u64,
    pub tax_total: u64,
    pub total: u64,
}

fn overflow() -> DomainError {
    DomainError::invariant("invoice amount overflow")
}

/// Validate one line and compute its amounts.
pub fn line_totals(line: &InvoiceLine) -> DomainResult<LineTotals> {
    if line.description.trim().is_empty() {
        return Err(DomainError::validation(
            "invoice line description cannot be empty",
        ));
    }
    if line.quantity == 0 {
        return Err(DomainError::validation(
            "invoice line quantity must be positive",
        ));
    }
    if line.unit_price == 0 {
        return Err(DomainError::validation(
            "invoice line unit_price must be positive",
        ));
    }

    let subtotal = u64::from(line.quantity)
        .checked_mul(line.unit_price)
        .ok_or_else(overflow)?;

    let discount = match line.discount {
        Discount::None => 0,
        Discount::Percent(rate) => checked_rate(rate, subtotal)?,
        Discount::Amount(amount) => {
            if amount > subtotal {
                return Err(DomainError::validation(
                    "invoice line discount exceeds line subtotal",
                ));
            }
            amount
        }
    };

    let taxable = subtotal - discount;
    let tax = checked_rate(line.tax_rate, taxable)?;
    let total = taxable.checked_add(tax).ok_or_else(overflow)?;

    Ok(LineTotals {
        subtotal,
        discount,
        taxable,
        tax,
        total,
    })
}

/// `Rate::apply` with the multiplication guarded against overflow.
fn checked_rate(rate: Rate, amount: u64) -> DomainResult<u64> {
    let scaled = u128::from(amount) * u128::from(rate.basis_points()) + 5_000;
    u64::try_from(scaled / 10_000).map_err(|_| overflow())
}

/// Compute totals for a set of lines. Empty input yields all zeros.
pub fn compute_totals(lines: &[InvoiceLine]) -> DomainResult<InvoiceTotals> {
    let mut totals = InvoiceTotals {
        lines: Vec::with_capacity(lines.len()),
        subtotal: 0,
        discount_total: 0,
        tax_total: 0,
        total: 0,
    };

    for line in lines {
        let lt = line_totals(line)?;
        totals.subtotal = totals.subtotal.checked_add(lt.subtotal).ok_or_else(overflow)?;
        totals.discount_total = totals
            .discount_total
            .checked_add(lt.discount)
            .ok_or_else(overflow)?;
        totals.tax_total = totals.tax_total.checked_add(lt.tax).ok_or_else(overflow)?;
        totals.total = totals.total.checked_add(lt.total).ok_or_else(overflow)?;
        totals.lines.push(lt);
    }

    Ok(totals)
}
