use chrono::NaiveDate;

/// Converts a VIEWS month index to the first day of that calendar month.
///
/// Month index 1 is January 1980; each increment advances one month. The
/// API only emits indices >= 1, but euclidean arithmetic keeps earlier
/// indices well defined.
pub fn month_to_date(month_id: i64) -> NaiveDate {
    let total = month_id - 1;
    let year = 1980 + total.div_euclid(12);
    let month = 1 + total.rem_euclid(12);
    NaiveDate::from_ymd_opt(year as i32, month as u32, 1)
        .expect("month index maps onto a valid calendar month")
}

/// Long-form rendering used for dataset time-period bounds,
/// e.g. `February 01 2025`.
pub fn month_to_long_date(month_id: i64) -> String {
    month_to_date(month_id).format("%B %d %Y").to_string()
}
