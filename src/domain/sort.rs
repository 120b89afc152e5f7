use sea_orm::{ColumnTrait, sea_query::Order};

use super::values::ValueProvider;

/// Resolve the list ordering from the `sort` and `order` request values
///
/// `sort` is either a column name (`sort=title&order=DESC`) or a JSON pair
/// (`sort=["title","DESC"]`). Unknown columns fall back to `default`.
pub fn parse_sorting<C>(
    values: &ValueProvider,
    sortable_columns: &[(&str, C)],
    default: (C, Order),
) -> (C, Order)
where
    C: ColumnTrait + Copy,
{
    let Some(sort) = values.get_str("sort").filter(|s| !s.trim().is_empty()) else {
        return default;
    };

    let (column_name, direction) = if sort.trim_start().starts_with('[') {
        let pair: Vec<String> = serde_json::from_str(&sort).unwrap_or_default();
        (pair.first().cloned().unwrap_or_default(), pair.get(1).cloned())
    } else {
        (sort, values.get_str("order"))
    };

    let Some(&(_, column)) = sortable_columns
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(column_name.trim()))
    else {
        return default;
    };

    let order = match direction.as_deref().map(str::trim) {
        Some(d) if d.eq_ignore_ascii_case("desc") => Order::Desc,
        _ => Order::Asc,
    };
    (column, order)
}
