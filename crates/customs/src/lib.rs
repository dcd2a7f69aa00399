//! Customs domain module (event-sourced).
//!
//! Export/import declarations filed for a single shipment, with duty
//! computed per item.

pub mod declaration;

pub use declaration::{
    AmendDeclarationItems, ClearDeclaration, CustomsDeclaration, DeclarationCleared,
    DeclarationCommand, DeclarationEvent, DeclarationFiled, DeclarationHeld, DeclarationId,
    DeclarationItem, DeclarationItemsAmended, DeclarationRejected, DeclarationStatus,
    DeclarationSubmitted, DeclarationTotals, FileDeclaration, HoldDeclaration, RejectDeclaration,
    SubmitDeclaration, declaration_totals,
};
