use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cargohub_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Rate, TenantId,
    value_object::is_country_code,
};
use cargohub_events::Event;
use cargohub_shipments::ShipmentId;

/// Customs declaration identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationId(pub AggregateId);

impl DeclarationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn declaration_number(&self) -> String {
        self.0.reference_code("CD-", 8)
    }
}

impl core::fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Declaration status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationStatus {
    Draft,
    Submitted,
    Held,
    Cleared,
    Rejected,
}

/// One declared line of goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationItem {
    pub description: String,
    /// Harmonized System code, 6 to 10 digits.
    pub hs_code: String,
    pub quantity: u32,
    /// Customs value in smallest currency unit.
    pub declared_value: u64,
    #[serde(default)]
    pub duty_rate: Rate,
    pub origin_country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeclarationTotals {
    pub declared_total: u64,
    pub duty_total: u64,
}

fn normalize_item(item: &DeclarationItem) -> DomainResult<DeclarationItem> {
    let description = item.description.trim();
    if description.is_empty() {
        return Err(DomainError::validation("item description cannot be empty"));
    }
    let hs_code: String = item.hs_code.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
    if !(6..=10).contains(&hs_code.len()) || !hs_code.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(format!(
            "invalid HS code: {}",
            item.hs_code
        )));
    }
    if item.quantity == 0 {
        return Err(DomainError::validation("item quantity must be positive"));
    }
    if item.declared_value == 0 {
        return Err(DomainError::validation("item declared value must be positive"));
    }
    let origin_country = item.origin_country.trim().to_uppercase();
    if !is_country_code(&origin_country) {
        return Err(DomainError::validation(
            "origin country must be a 2-letter ISO code",
        ));
    }

    Ok(DeclarationItem {
        description: description.to_string(),
        hs_code,
        quantity: item.quantity,
        declared_value: item.declared_value,
        duty_rate: item.duty_rate,
        origin_country,
    })
}

/// Sum declared values and per-item duty.
pub fn declaration_totals(items: &[DeclarationItem]) -> DomainResult<DeclarationTotals> {
    let overflow = || DomainError::invariant("declaration amount overflow");
    items.iter().try_fold(DeclarationTotals::default(), |acc, item| {
        let duty = u128::from(item.declared_value) * u128::from(item.duty_rate.basis_points());
        let duty = u64::try_from((duty + 5_000) / 10_000).map_err(|_| overflow())?;
        Ok(DeclarationTotals {
            declared_total: acc
                .declared_total
                .checked_add(item.declared_value)
                .ok_or_else(overflow)?,
            duty_total: acc.duty_total.checked_add(duty).ok_or_else(overflow)?,
        })
    })
}

fn validated_items(items: &[DeclarationItem]) -> DomainResult<(Vec<DeclarationItem>, DeclarationTotals)> {
    if items.is_empty() {
        return Err(DomainError::validation(
            "declaration requires at least one item",
        ));
    }
    let items = items.iter().map(normalize_item).collect::<DomainResult<Vec<_>>>()?;
    let totals = declaration_totals(&items)?;
    Ok((items, totals))
}

fn required_reason(reason: &str) -> DomainResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::validation("reason cannot be empty"));
    }
    Ok(reason.to_string())
}

/// Aggregate root: CustomsDeclaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomsDeclaration {
    id: DeclarationId,
    tenant_id: Option<TenantId>,
    declaration_number: String,
    shipment_id: Option<ShipmentId>,
    exporter: String,
    importer: String,
    destination_country: String,
    items: Vec<DeclarationItem>,
    totals: DeclarationTotals,
    status: DeclarationStatus,
    status_reason: Option<String>,
    version: u64,
    created: bool,
}

impl CustomsDeclaration {
    pub fn empty(id: DeclarationId) -> Self {
        Self {
            id,
            tenant_id: None,
            declaration_number: String::new(),
            shipment_id: None,
            exporter: String::new(),
            importer: String::new(),
            destination_country: String::new(),
            items: Vec::new(),
            totals: DeclarationTotals::default(),
            status: DeclarationStatus::Draft,
            status_reason: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> DeclarationId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn declaration_number(&self) -> &str {
        &self.declaration_number
    }

    pub fn shipment_id(&self) -> Option<ShipmentId> {
        self.shipment_id
    }

    pub fn exporter(&self) -> &str {
        &self.exporter
    }

    pub fn importer(&self) -> &str {
        &self.importer
    }

    pub fn destination_country(&self) -> &str {
        &self.destination_country
    }

    pub fn items(&self) -> &[DeclarationItem] {
        &self.items
    }

    pub fn totals(&self) -> DeclarationTotals {
        self.totals
    }

    pub fn status(&self) -> DeclarationStatus {
        self.status
    }

    /// Reason recorded with the latest hold or rejection.
    pub fn status_reason(&self) -> Option<&str> {
        self.status_reason.as_deref()
    }
}

impl AggregateRoot for CustomsDeclaration {
    type Id = DeclarationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDeclaration {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub shipment_id: ShipmentId,
    pub exporter: String,
    pub importer: String,
    pub destination_country: String,
    pub items: Vec<DeclarationItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendDeclarationItems {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub items: Vec<DeclarationItem>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDeclaration {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearDeclaration {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldDeclaration {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectDeclaration {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationCommand {
    FileDeclaration(FileDeclaration),
    AmendDeclarationItems(AmendDeclarationItems),
    SubmitDeclaration(SubmitDeclaration),
    ClearDeclaration(ClearDeclaration),
    HoldDeclaration(HoldDeclaration),
    RejectDeclaration(RejectDeclaration),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationFiled {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub declaration_number: String,
    pub shipment_id: ShipmentId,
    pub exporter: String,
    pub importer: String,
    pub destination_country: String,
    pub items: Vec<DeclarationItem>,
    pub totals: DeclarationTotals,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationItemsAmended {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub items: Vec<DeclarationItem>,
    pub totals: DeclarationTotals,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationSubmitted {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationCleared {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationHeld {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRejected {
    pub tenant_id: TenantId,
    pub declaration_id: DeclarationId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclarationEvent {
    DeclarationFiled(DeclarationFiled),
    DeclarationItemsAmended(DeclarationItemsAmended),
    DeclarationSubmitted(DeclarationSubmitted),
    DeclarationCleared(DeclarationCleared),
    DeclarationHeld(DeclarationHeld),
    DeclarationRejected(DeclarationRejected),
}

impl Event for DeclarationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeclarationEvent::DeclarationFiled(_) => "customs.declaration.filed",
            DeclarationEvent::DeclarationItemsAmended(_) => "customs.declaration.items_amended",
            DeclarationEvent::DeclarationSubmitted(_) => "customs.declaration.submitted",
            DeclarationEvent::DeclarationCleared(_) => "customs.declaration.cleared",
            DeclarationEvent::DeclarationHeld(_) => "customs.declaration.held",
            DeclarationEvent::DeclarationRejected(_) => "customs.declaration.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeclarationEvent::DeclarationFiled(e) => e.occurred_at,
            DeclarationEvent::DeclarationItemsAmended(e) => e.occurred_at,
            DeclarationEvent::DeclarationSubmitted(e) => e.occurred_at,
            DeclarationEvent::DeclarationCleared(e) => e.occurred_at,
            DeclarationEvent::DeclarationHeld(e) => e.occurred_at,
            DeclarationEvent::DeclarationRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CustomsDeclaration {
    type Command = DeclarationCommand;
    type Event = DeclarationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeclarationEvent::DeclarationFiled(e) => {
                self.id = e.declaration_id;
                self.tenant_id = Some(e.tenant_id);
                self.declaration_number = e.declaration_number.clone();
                self.shipment_id = Some(e.shipment_id);
                self.exporter = e.exporter.clone();
                self.importer = e.importer.clone();
                self.destination_country = e.destination_country.clone();
                self.items = e.items.clone();
                self.totals = e.totals;
                self.status = DeclarationStatus::Draft;
                self.created = true;
            }
            DeclarationEvent::DeclarationItemsAmended(e) => {
                self.items = e.items.clone();
                self.totals = e.totals;
            }
            DeclarationEvent::DeclarationSubmitted(_) => {
                self.status = DeclarationStatus::Submitted;
            }
            DeclarationEvent::DeclarationCleared(_) => {
                self.status = DeclarationStatus::Cleared;
                self.status_reason = None;
            }
            DeclarationEvent::DeclarationHeld(e) => {
                self.status = DeclarationStatus::Held;
                self.status_reason = Some(e.reason.clone());
            }
            DeclarationEvent::DeclarationRejected(e) => {
                self.status = DeclarationStatus::Rejected;
                self.status_reason = Some(e.reason.clone());
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let event = match command {
            DeclarationCommand::FileDeclaration(cmd) => return self.handle_file(cmd),
            DeclarationCommand::AmendDeclarationItems(cmd) => {
                self.ensure_existing(cmd.tenant_id, cmd.declaration_id)?;
                self.ensure_status(&[DeclarationStatus::Draft], "amended")?;
                let (items, totals) = validated_items(&cmd.items)?;
                DeclarationEvent::DeclarationItemsAmended(DeclarationItemsAmended {
                    tenant_id: cmd.tenant_id,
                    declaration_id: cmd.declaration_id,
                    items,
                    totals,
                    occurred_at: cmd.occurred_at,
                })
            }
            DeclarationCommand::SubmitDeclaration(cmd) => {
                self.ensure_existing(cmd.tenant_id, cmd.declaration_id)?;
                self.ensure_status(&[DeclarationStatus::Draft], "submitted")?;
                DeclarationEvent::DeclarationSubmitted(DeclarationSubmitted {
                    tenant_id: cmd.tenant_id,
                    declaration_id: cmd.declaration_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            DeclarationCommand::ClearDeclaration(cmd) => {
                self.ensure_existing(cmd.tenant_id, cmd.declaration_id)?;
                self.ensure_status(
                    &[DeclarationStatus::Submitted, DeclarationStatus::Held],
                    "cleared",
                )?;
                DeclarationEvent::DeclarationCleared(DeclarationCleared {
                    tenant_id: cmd.tenant_id,
                    declaration_id: cmd.declaration_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            DeclarationCommand::HoldDeclaration(cmd) => {
                self.ensure_existing(cmd.tenant_id, cmd.declaration_id)?;
                self.ensure_status(&[DeclarationStatus::Submitted], "held")?;
                DeclarationEvent::DeclarationHeld(DeclarationHeld {
                    tenant_id: cmd.tenant_id,
                    declaration_id: cmd.declaration_id,
                    reason: required_reason(&cmd.reason)?,
                    occurred_at: cmd.occurred_at,
                })
            }
            DeclarationCommand::RejectDeclaration(cmd) => {
                self.ensure_existing(cmd.tenant_id, cmd.declaration_id)?;
                self.ensure_status(
                    &[DeclarationStatus::Submitted, DeclarationStatus::Held],
                    "rejected",
                )?;
                DeclarationEvent::DeclarationRejected(DeclarationRejected {
                    tenant_id: cmd.tenant_id,
                    declaration_id: cmd.declaration_id,
                    reason: required_reason(&cmd.reason)?,
                    occurred_at: cmd.occurred_at,
                })
            }
        };

        Ok(vec![event])
    }
}

impl CustomsDeclaration {
    fn ensure_existing(&self, tenant_id: TenantId, id: DeclarationId) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.id != id {
            return Err(DomainError::invariant("declaration_id mismatch"));
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[DeclarationStatus], action: &str) -> DomainResult<()> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        Err(DomainError::invariant(format!(
            "a {:?} declaration cannot be {action}",
            self.status
        )))
    }

    fn handle_file(&self, cmd: &FileDeclaration) -> DomainResult<Vec<DeclarationEvent>> {
        if self.created {
            return Err(DomainError::conflict("declaration already exists"));
        }
        let exporter = cmd.exporter.trim();
        let importer = cmd.importer.trim();
        if exporter.is_empty() || importer.is_empty() {
            return Err(DomainError::validation(
                "exporter and importer are required",
            ));
        }
        let destination_country = cmd.destination_country.trim().to_uppercase();
        if !is_country_code(&destination_country) {
            return Err(DomainError::validation(
                "destination country must be a 2-letter ISO code",
            ));
        }
        let (items, totals) = validated_items(&cmd.items)?;

        Ok(vec![DeclarationEvent::DeclarationFiled(DeclarationFiled {
            tenant_id: cmd.tenant_id,
            declaration_id: cmd.declaration_id,
            declaration_number: cmd.declaration_id.declaration_number(),
            shipment_id: cmd.shipment_id,
            exporter: exporter.to_string(),
            importer: importer.to_string(),
            destination_country,
            items,
            totals,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cargohub_events::execute;
    use proptest::prelude::*;

    fn item(value: u64, duty_bp: u32) -> DeclarationItem {
        DeclarationItem {
            description: "Cotton shirts".to_string(),
            hs_code: "6205.20".to_string(),
            quantity: 10,
            declared_value: value,
            duty_rate: Rate::new(duty_bp).unwrap(),
            origin_country: "bd".to_string(),
        }
    }

    fn filed() -> (CustomsDeclaration, TenantId) {
        let tenant_id = TenantId::new();
        let declaration_id = DeclarationId::new(AggregateId::new());
        let mut declaration = CustomsDeclaration::empty(declaration_id);
        execute(
            &mut declaration,
            &DeclarationCommand::FileDeclaration(FileDeclaration {
                tenant_id,
                declaration_id,
                shipment_id: ShipmentId::new(AggregateId::new()),
                exporter: "Dhaka Textiles Ltd".to_string(),
                importer: "Acme BV".to_string(),
                destination_country: "nl".to_string(),
                items: vec![item(10_000, 1_200), item(2_550, 1_000)],
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (declaration, tenant_id)
    }

    fn submit(declaration: &mut CustomsDeclaration, tenant_id: TenantId) {
        execute(
            declaration,
            &DeclarationCommand::SubmitDeclaration(SubmitDeclaration {
                tenant_id,
                declaration_id: declaration.id_typed(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
    }

    #[test]
    fn filing_normalizes_items_and_computes_duty() {
        let (declaration, _) = filed();
        assert_eq!(declaration.status(), DeclarationStatus::Draft);
        assert_eq!(declaration.destination_country(), "NL");
        assert_eq!(declaration.items()[0].hs_code, "620520");
        assert_eq!(declaration.items()[0].origin_country, "BD");
        // 12% of 10000 plus 10% of 2550
        assert_eq!(
            declaration.totals(),
            DeclarationTotals {
                declared_total: 12_550,
                duty_total: 1_455
            }
        );
        assert!(declaration.declaration_number().starts_with("CD-"));
    }

    #[test]
    fn invalid_hs_code_is_rejected() {
        let mut bad = item(100, 0);
        bad.hs_code = "62AB".to_string();
        assert!(matches!(
            validated_items(&[bad]),
            Err(DomainError::Validation(_))
        ));
        assert!(validated_items(&[]).is_err());
    }

    #[test]
    fn items_can_only_be_amended_in_draft() {
        let (mut declaration, tenant_id) = filed();
        submit(&mut declaration, tenant_id);

        let err = declaration
            .handle(&DeclarationCommand::AmendDeclarationItems(AmendDeclarationItems {
                tenant_id,
                declaration_id: declaration.id_typed(),
                items: vec![item(500, 0)],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn held_declaration_can_be_cleared() {
        let (mut declaration, tenant_id) = filed();
        submit(&mut declaration, tenant_id);

        let id = declaration.id_typed();
        let blank = declaration
            .handle(&DeclarationCommand::HoldDeclaration(HoldDeclaration {
                tenant_id,
                declaration_id: id,
                reason: "  ".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(blank, DomainError::Validation(_)));

        execute(
            &mut declaration,
            &DeclarationCommand::HoldDeclaration(HoldDeclaration {
                tenant_id,
                declaration_id: id,
                reason: "invoice missing".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(declaration.status_reason(), Some("invoice missing"));

        execute(
            &mut declaration,
            &DeclarationCommand::ClearDeclaration(ClearDeclaration {
                tenant_id,
                declaration_id: id,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(declaration.status(), DeclarationStatus::Cleared);
        assert_eq!(declaration.version(), 4);
    }

    #[test]
    fn filing_without_items_is_rejected() {
        let declaration_id = DeclarationId::new(AggregateId::new());
        let err = CustomsDeclaration::empty(declaration_id)
            .handle(&DeclarationCommand::FileDeclaration(FileDeclaration {
                tenant_id: TenantId::new(),
                declaration_id,
                shipment_id: ShipmentId::new(AggregateId::new()),
                exporter: "Dhaka Textiles Ltd".to_string(),
                importer: "Acme BV".to_string(),
                destination_country: "nl".to_string(),
                items: vec![],
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn held_declaration_can_be_rejected_but_not_held_again() {
        let (mut declaration, tenant_id) = filed();
        submit(&mut declaration, tenant_id);
        let id = declaration.id_typed();

        execute(
            &mut declaration,
            &DeclarationCommand::HoldDeclaration(HoldDeclaration {
                tenant_id,
                declaration_id: id,
                reason: "invoice missing".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let again = declaration
            .handle(&DeclarationCommand::HoldDeclaration(HoldDeclaration {
                tenant_id,
                declaration_id: id,
                reason: "still missing".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(again, DomainError::InvariantViolation(_)));

        let blank = declaration
            .handle(&DeclarationCommand::RejectDeclaration(RejectDeclaration {
                tenant_id,
                declaration_id: id,
                reason: String::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(blank, DomainError::Validation(_)));

        execute(
            &mut declaration,
            &DeclarationCommand::RejectDeclaration(RejectDeclaration {
                tenant_id,
                declaration_id: id,
                reason: "prohibited goods".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(declaration.status(), DeclarationStatus::Rejected);
        assert_eq!(declaration.status_reason(), Some("prohibited goods"));
    }

    #[test]
    fn draft_cannot_be_cleared_directly() {
        let (declaration, tenant_id) = filed();
        let err = declaration
            .handle(&DeclarationCommand::ClearDeclaration(ClearDeclaration {
                tenant_id,
                declaration_id: declaration.id_typed(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    proptest! {
        #[test]
        fn duty_total_is_sum_of_rounded_item_duties(
            values in prop::collection::vec((1u64..1_000_000, 0u32..=10_000), 1..10)
        ) {
            let items: Vec<_> = values.iter().map(|(v, bp)| item(*v, *bp)).collect();
            let totals = declaration_totals(&items).unwrap();
            let expected_duty: u64 = items.iter().map(|i| i.duty_rate.apply(i.declared_value)).sum();
            prop_assert_eq!(totals.duty_total, expected_duty);
            prop_assert_eq!(totals.declared_total, values.iter().map(|(v, _)| *v).sum::<u64>());
            prop_assert!(totals.duty_total <= totals.declared_total);
        }
    }
}
