//! Current-environment attribute finder.

use resource_authz_sdk::{
    AttributeBag, AttributeDesignator, AttributeFinder, AttributeValue, DataType,
    DesignatorCategory, EvaluationContext, FinderResult, ids,
};

const SUPPORTED_IDS: &[&str] = &[ids::CURRENT_TIME, ids::CURRENT_DATE, ids::CURRENT_DATE_TIME];

/// Supplies the current time, date and date-time of the evaluation.
///
/// The values come from the context's evaluation time, so every lookup within
/// one request sees the same instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentEnvFinder;

impl AttributeFinder for CurrentEnvFinder {
    fn name(&self) -> &'static str {
        "current-environment"
    }

    fn supported_designator_types(&self) -> &[DesignatorCategory] {
        &[DesignatorCategory::Environment]
    }

    fn supported_ids(&self) -> Option<&[&'static str]> {
        Some(SUPPORTED_IDS)
    }

    fn find_attribute(
        &self,
        designator: &AttributeDesignator,
        ctx: &EvaluationContext,
    ) -> FinderResult {
        let now = ctx.evaluation_time();
        let value = match (designator.attribute_id.as_str(), designator.data_type) {
            (ids::CURRENT_TIME, DataType::Time) => AttributeValue::Time(now.time()),
            (ids::CURRENT_DATE, DataType::Date) => AttributeValue::Date(now.date_naive()),
            (ids::CURRENT_DATE_TIME, DataType::DateTime) => AttributeValue::DateTime(now),
            _ => return Ok(AttributeBag::empty(designator.data_type)),
        };
        Ok(AttributeBag::new(designator.data_type, vec![value]))
    }
}
