/// Mean rating and count over every review a doctor has received.
pub fn aggregate_rating(ratings: &[i32]) -> (f64, i64) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: i64 = ratings.iter().map(|r| *r as i64).sum();
    (sum as f64 / ratings.len() as f64, ratings.len() as i64)
}
