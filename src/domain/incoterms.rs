//! Incoterm cost-responsibility tables.
//!
//! Each trade term maps to a fixed, ordered list of line slots. The slot
//! ordinals are part of the printed label and keep their numbering even when
//! a term skips a slot (FCA has no slot 4).

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::entities::{CostContext, CostLineItem};
use super::error::ValidationError;
use self::LineCategory::*;

/// Incoterms 2020 plus the two legacy terms still seen on older contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Incoterm {
    Exw,
    Fca,
    Fas,
    Fob,
    Cfr,
    Cif,
    Cpt,
    Cip,
    Dap,
    Dpu,
    Ddp,
    /// Replaced by DPU in Incoterms 2020.
    Dat,
    /// Replaced by DAP in Incoterms 2010.
    Ddu,
}

impl Incoterm {
    pub const ALL: [Incoterm; 13] = [
        Self::Exw,
        Self::Fca,
        Self::Fas,
        Self::Fob,
        Self::Cfr,
        Self::Cif,
        Self::Cpt,
        Self::Cip,
        Self::Dap,
        Self::Dpu,
        Self::Ddp,
        Self::Dat,
        Self::Ddu,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Exw => "EXW",
            Self::Fca => "FCA",
            Self::Fas => "FAS",
            Self::Fob => "FOB",
            Self::Cfr => "CFR",
            Self::Cif => "CIF",
            Self::Cpt => "CPT",
            Self::Cip => "CIP",
            Self::Dap => "DAP",
            Self::Dpu => "DPU",
            Self::Ddp => "DDP",
            Self::Dat => "DAT",
            Self::Ddu => "DDU",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exw => "Ex Works",
            Self::Fca => "Free Carrier",
            Self::Fas => "Free Alongside Ship",
            Self::Fob => "Free On Board",
            Self::Cfr => "Cost and Freight",
            Self::Cif => "Cost, Insurance and Freight",
            Self::Cpt => "Carriage Paid To",
            Self::Cip => "Carriage and Insurance Paid To",
            Self::Dap => "Delivered At Place",
            Self::Dpu => "Delivered at Place Unloaded",
            Self::Ddp => "Delivered Duty Paid",
            Self::Dat => "Delivered At Terminal",
            Self::Ddu => "Delivered Duty Unpaid",
        }
    }

    pub fn group(&self) -> IncotermGroup {
        match self {
            Self::Exw => IncotermGroup::Departure,
            Self::Fca | Self::Fas | Self::Fob => IncotermGroup::MainCarriageUnpaid,
            Self::Cfr | Self::Cif | Self::Cpt | Self::Cip => IncotermGroup::MainCarriagePaid,
            Self::Dap | Self::Dpu | Self::Ddp | Self::Dat | Self::Ddu => IncotermGroup::Arrival,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Dat | Self::Ddu)
    }

    /// Ordered line slots the seller pays for under this term.
    pub fn rule(&self) -> &'static [LineSlot] {
        match self {
            Self::Exw => EXW_SLOTS,
            Self::Fca => FCA_SLOTS,
            Self::Fas | Self::Fob => FAS_FOB_SLOTS,
            Self::Cfr | Self::Cpt => CFR_CPT_SLOTS,
            Self::Cif | Self::Cip => CIF_CIP_SLOTS,
            Self::Dap | Self::Ddu => DAP_DDU_SLOTS,
            Self::Dpu | Self::Dat => DPU_DAT_SLOTS,
            Self::Ddp => DDP_SLOTS,
        }
    }
}

impl fmt::Display for Incoterm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Incoterm {
    type Err = ValidationError;

    /// Exact, case-sensitive match on the three-letter code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|term| term.code() == s)
            .ok_or_else(|| ValidationError::UnknownIncoterm(s.to_string()))
    }
}

/// The four Incoterm families, ordered by how much of the journey the seller pays for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncotermGroup {
    Departure,
    MainCarriageUnpaid,
    MainCarriagePaid,
    Arrival,
}

impl IncotermGroup {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Departure => "Departure (E)",
            Self::MainCarriageUnpaid => "Main carriage unpaid (F)",
            Self::MainCarriagePaid => "Main carriage paid (C)",
            Self::Arrival => "Arrival (D)",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    ProductCost,
    InlandKr,
    ExportClearance,
    ThcLoading,
    OceanFreight,
    HandlingFee,
    Insurance,
    RailFreight,
    DestUnloading,
    DutyAndTax,
}

impl LineCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductCost => "Product Cost",
            Self::InlandKr => "Inland(KR)",
            Self::ExportClearance => "Export Clearance",
            Self::ThcLoading => "THC(Loading)",
            Self::OceanFreight => "Ocean Freight",
            Self::HandlingFee => "Handling Fee",
            Self::Insurance => "Insurance",
            Self::RailFreight => "Rail Freight(TCR)",
            Self::DestUnloading => "Dest Unloading",
            Self::DutyAndTax => "Duty & Tax",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSlot {
    pub ordinal: u8,
    pub category: LineCategory,
}

impl LineSlot {
    const fn new(ordinal: u8, category: LineCategory) -> Self {
        Self { ordinal, category }
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.ordinal, self.category.label())
    }
}

const EXW_SLOTS: &[LineSlot] = &[LineSlot::new(1, ProductCost)];

const FCA_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ExportClearance),
    LineSlot::new(5, HandlingFee),
];

const FAS_FOB_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ExportClearance),
    LineSlot::new(4, ThcLoading),
    LineSlot::new(5, HandlingFee),
];

const CFR_CPT_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ThcLoading),
    LineSlot::new(4, ExportClearance),
    LineSlot::new(5, OceanFreight),
    LineSlot::new(6, HandlingFee),
];

const CIF_CIP_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ThcLoading),
    LineSlot::new(4, ExportClearance),
    LineSlot::new(5, OceanFreight),
    LineSlot::new(6, HandlingFee),
    LineSlot::new(7, Insurance),
];

const DAP_DDU_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ThcLoading),
    LineSlot::new(4, ExportClearance),
    LineSlot::new(5, OceanFreight),
    LineSlot::new(6, HandlingFee),
    LineSlot::new(8, RailFreight),
];

const DPU_DAT_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ThcLoading),
    LineSlot::new(4, ExportClearance),
    LineSlot::new(5, OceanFreight),
    LineSlot::new(6, HandlingFee),
    LineSlot::new(7, Insurance),
    LineSlot::new(8, RailFreight),
    LineSlot::new(9, DestUnloading),
];

const DDP_SLOTS: &[LineSlot] = &[
    LineSlot::new(1, ProductCost),
    LineSlot::new(2, InlandKr),
    LineSlot::new(3, ThcLoading),
    LineSlot::new(4, ExportClearance),
    LineSlot::new(5, OceanFreight),
    LineSlot::new(6, HandlingFee),
    LineSlot::new(7, Insurance),
    LineSlot::new(8, RailFreight),
    LineSlot::new(9, DestUnloading),
    LineSlot::new(10, DutyAndTax),
];

/// Fixed amounts the allocator applies on top of the cost context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Flat export customs clearance charge in USD.
    pub export_clearance_fee: Decimal,
    /// Share of the margin billed as handling fee under F terms.
    pub unpaid_handling_share: Decimal,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            export_clearance_fee: dec!(50),
            unpaid_handling_share: dec!(0.5),
        }
    }
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.export_clearance_fee < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount {
                field: "export_clearance_fee",
                value: self.export_clearance_fee,
            });
        }
        if self.unpaid_handling_share < Decimal::ZERO || self.unpaid_handling_share > Decimal::ONE
        {
            return Err(ValidationError::InvalidConfig(format!(
                "unpaid_handling_share must be within [0, 1] (got {})",
                self.unpaid_handling_share
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct IncotermAllocator {
    config: AllocatorConfig,
}

impl IncotermAllocator {
    pub fn new(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Seller's cost lines for `term`, in presentation order.
    pub fn allocate(
        &self,
        term: Incoterm,
        ctx: &CostContext,
    ) -> Result<Vec<CostLineItem>, ValidationError> {
        ctx.validate()?;

        Ok(term
            .rule()
            .iter()
            .map(|slot| CostLineItem {
                label: slot.label(),
                category: slot.category,
                amount: self.amount_for(term, slot.category, ctx),
            })
            .collect())
    }

    fn amount_for(&self, term: Incoterm, category: LineCategory, ctx: &CostContext) -> Decimal {
        match category {
            ProductCost => ctx.mfg_cost,
            InlandKr => ctx.inland,
            ExportClearance => self.config.export_clearance_fee,
            ThcLoading => ctx.thc,
            OceanFreight => ctx.ocean,
            HandlingFee => match term.group() {
                IncotermGroup::MainCarriageUnpaid => ctx.margin * self.config.unpaid_handling_share,
                _ => ctx.margin,
            },
            Insurance => ctx.insurance,
            RailFreight => ctx.rail,
            // Unloading at destination is billed at the loading terminal rate.
            DestUnloading => ctx.thc,
            DutyAndTax => ctx.duty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CostContext {
        CostContext {
            mfg_cost: dec!(72463.77),
            inland: dec!(400),
            thc: dec!(150),
            ocean: dec!(1967.13825),
            rail: dec!(1485),
            insurance: dec!(223.29),
            duty: dec!(6091.21),
            margin: dec!(3392.45),
        }
    }

    fn labels(items: &[CostLineItem]) -> Vec<&str> {
        items.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn exw_is_product_cost_only() {
        let items = IncotermAllocator::default()
            .allocate(Incoterm::Exw, &context())
            .unwrap();
        assert_eq!(labels(&items), vec!["1.Product Cost"]);
        assert_eq!(items[0].amount, dec!(72463.77));
    }

    #[test]
    fn every_term_starts_with_product_cost() {
        let allocator = IncotermAllocator::default();
        for term in Incoterm::ALL {
            let items = allocator.allocate(term, &context()).unwrap();
            assert_eq!(items[0].label, "1.Product Cost", "{term}");
            assert_eq!(items[0].category, LineCategory::ProductCost);
        }
    }

    #[test]
    fn fob_includes_thc_and_half_margin() {
        let items = IncotermAllocator::default()
            .allocate(Incoterm::Fob, &context())
            .unwrap();
        assert_eq!(
            labels(&items),
            vec![
                "1.Product Cost",
                "2.Inland(KR)",
                "3.Export Clearance",
                "4.THC(Loading)",
                "5.Handling Fee",
            ]
        );
        assert_eq!(items[2].amount, dec!(50));
        assert_eq!(items[3].amount, dec!(150));
        assert_eq!(items[4].amount, dec!(1696.225));
    }

    #[test]
    fn fca_skips_thc_but_keeps_numbering() {
        let items = IncotermAllocator::default()
            .allocate(Incoterm::Fca, &context())
            .unwrap();
        assert_eq!(
            labels(&items),
            vec![
                "1.Product Cost",
                "2.Inland(KR)",
                "3.Export Clearance",
                "5.Handling Fee"
            ]
        );
        assert_eq!(Incoterm::Fas.rule(), Incoterm::Fob.rule());
    }

    #[test]
    fn insurance_only_for_cif_and_cip_in_main_paid_group() {
        let allocator = IncotermAllocator::default();
        let has_insurance = |term| {
            allocator
                .allocate(term, &context())
                .unwrap()
                .iter()
                .any(|item| item.category == LineCategory::Insurance)
        };
        assert!(has_insurance(Incoterm::Cif));
        assert!(has_insurance(Incoterm::Cip));
        assert!(!has_insurance(Incoterm::Cfr));
        assert!(!has_insurance(Incoterm::Cpt));
    }

    #[test]
    fn main_paid_terms_bill_full_margin() {
        let items = IncotermAllocator::default()
            .allocate(Incoterm::Cfr, &context())
            .unwrap();
        assert_eq!(
            labels(&items),
            vec![
                "1.Product Cost",
                "2.Inland(KR)",
                "3.THC(Loading)",
                "4.Export Clearance",
                "5.Ocean Freight",
                "6.Handling Fee",
            ]
        );
        assert_eq!(items[4].amount, dec!(1967.13825));
        assert_eq!(items[5].amount, dec!(3392.45));
    }

    #[test]
    fn arrival_terms_follow_insurance_unloading_and_duty_rules() {
        let allocator = IncotermAllocator::default();
        let categories = |term| -> Vec<LineCategory> {
            allocator
                .allocate(term, &context())
                .unwrap()
                .into_iter()
                .map(|item| item.category)
                .collect()
        };

        for term in [Incoterm::Dap, Incoterm::Dpu, Incoterm::Ddp, Incoterm::Dat, Incoterm::Ddu] {
            let cats = categories(term);
            assert!(cats.contains(&LineCategory::RailFreight), "{term}");
            assert_eq!(
                cats.contains(&LineCategory::Insurance),
                !matches!(term, Incoterm::Dap | Incoterm::Ddu),
                "{term}"
            );
            assert_eq!(
                cats.contains(&LineCategory::DestUnloading),
                matches!(term, Incoterm::Dpu | Incoterm::Dat | Incoterm::Ddp),
                "{term}"
            );
            assert_eq!(
                cats.contains(&LineCategory::DutyAndTax),
                term == Incoterm::Ddp,
                "{term}"
            );
        }
    }

    #[test]
    fn ddp_ends_with_unloading_then_duty() {
        let items = IncotermAllocator::default()
            .allocate(Incoterm::Ddp, &context())
            .unwrap();
        let tail: Vec<_> = items[items.len() - 2..].iter().collect();
        assert_eq!(tail[0].label, "9.Dest Unloading");
        assert_eq!(tail[0].amount, dec!(150));
        assert_eq!(tail[1].label, "10.Duty & Tax");
        assert_eq!(tail[1].amount, dec!(6091.21));
    }

    #[test]
    fn ddp_has_the_most_line_items() {
        let ddp = Incoterm::Ddp.rule().len();
        for term in Incoterm::ALL.into_iter().filter(|t| *t != Incoterm::Ddp) {
            assert!(term.rule().len() < ddp, "{term}");
        }
    }

    #[test]
    fn allocation_is_repeatable() {
        let allocator = IncotermAllocator::default();
        let ctx = context();
        for term in Incoterm::ALL {
            assert_eq!(
                allocator.allocate(term, &ctx).unwrap(),
                allocator.allocate(term, &ctx).unwrap()
            );
        }
    }

    #[test]
    fn parsing_is_exact_and_case_sensitive() {
        assert_eq!("DDP".parse::<Incoterm>().unwrap(), Incoterm::Ddp);
        assert_eq!("DAT".parse::<Incoterm>().unwrap(), Incoterm::Dat);
        assert_eq!(
            "ddp".parse::<Incoterm>().unwrap_err(),
            ValidationError::UnknownIncoterm("ddp".into())
        );
        assert!("FOB ".parse::<Incoterm>().is_err());
        assert!("XYZ".parse::<Incoterm>().is_err());
        for term in Incoterm::ALL {
            assert_eq!(term.code().parse::<Incoterm>().unwrap(), term);
        }
    }

    #[test]
    fn custom_allocator_config_changes_fixed_amounts() {
        let allocator = IncotermAllocator::new(AllocatorConfig {
            export_clearance_fee: dec!(80),
            unpaid_handling_share: dec!(0.25),
        });
        let items = allocator.allocate(Incoterm::Fca, &context()).unwrap();
        assert_eq!(items[2].amount, dec!(80));
        assert_eq!(items[3].amount, dec!(848.1125));
    }

    #[test]
    fn negative_context_is_rejected_before_allocation() {
        let ctx = CostContext {
            ocean: dec!(-5),
            ..context()
        };
        assert!(matches!(
            IncotermAllocator::default().allocate(Incoterm::Cif, &ctx),
            Err(ValidationError::NegativeAmount { field: "ocean", .. })
        ));
    }

    #[test]
    fn allocator_config_validation() {
        assert!(AllocatorConfig::default().validate().is_ok());
        let bad = AllocatorConfig {
            unpaid_handling_share: dec!(1.5),
            ..AllocatorConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
