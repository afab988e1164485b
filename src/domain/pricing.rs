//! Reservation pricing: line subtotals, distance surcharge and seasonal prices.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::entity::seasonal_prices;

/// Surcharge per kilometre from the warehouse, in whole CLP.
pub const CLP_PER_KM: i64 = 1000;

/// Round a monetary amount to 2 dp, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a distance to the whole metre stored on reservations.
///
/// Metre precision keeps `distance_surcharge` of the stored value equal to
/// the surcharge of the submitted one.
pub fn round_distance(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
}

/// `round(distance_km × 1000)` in whole CLP, widened to the money shape.
pub fn distance_surcharge(distance_km: Decimal) -> Decimal {
    let clp = (distance_km * Decimal::from(CLP_PER_KM))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    round_money(clp)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineInput {
    pub game_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub game_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub lines: Vec<PricedLine>,
    pub items_total: Decimal,
    pub distance_price: Option<Decimal>,
    pub total: Decimal,
}

pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    round_money(unit_price * Decimal::from(quantity))
}

/// Price a set of lines plus the optional distance surcharge.
///
/// Lines come back sorted by `game_id` and are summed in that order.
pub fn price_reservation(lines: &[LineInput], distance_km: Option<Decimal>) -> PriceBreakdown {
    let mut priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| {
            let unit_price = round_money(line.unit_price);
            PricedLine {
                game_id: line.game_id,
                quantity: line.quantity,
                unit_price,
                subtotal: line_subtotal(unit_price, line.quantity),
            }
        })
        .collect();
    priced.sort_by_key(|line| line.game_id);

    let items_total = priced
        .iter()
        .fold(Decimal::ZERO, |acc, line| acc + line.subtotal);
    let distance_price = distance_km.map(distance_surcharge);
    let total = round_money(items_total + distance_price.unwrap_or(Decimal::ZERO));

    PriceBreakdown {
        lines: priced,
        items_total,
        distance_price,
        total,
    }
}

/// Recompute a total from already persisted subtotals.
pub fn total_from_subtotals(
    subtotals: impl IntoIterator<Item = Decimal>,
    distance_price: Option<Decimal>,
) -> Decimal {
    let items: Decimal = subtotals.into_iter().sum();
    round_money(items + distance_price.unwrap_or(Decimal::ZERO))
}

/// A dated price override, detached from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rental_price: Decimal,
    pub discount_percent: Decimal,
}

impl From<&seasonal_prices::Model> for SeasonalWindow {
    fn from(model: &seasonal_prices::Model) -> Self {
        Self {
            start_date: model.start_date,
            end_date: model.end_date,
            rental_price: model.rental_price,
            discount_percent: model.discount_percent,
        }
    }
}

impl SeasonalWindow {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn discounted_price(&self) -> Decimal {
        let factor = Decimal::ONE - self.discount_percent / Decimal::ONE_HUNDRED;
        round_money(self.rental_price * factor)
    }
}

/// Price of a game on `date`: the latest-starting covering window wins,
/// ties go to the larger discount; with no window the base price applies.
pub fn effective_price(base_price: Decimal, windows: &[SeasonalWindow], date: NaiveDate) -> Decimal {
    windows
        .iter()
        .filter(|window| window.covers(date))
        .max_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.discount_percent.cmp(&b.discount_percent))
        })
        .map(SeasonalWindow::discounted_price)
        .unwrap_or_else(|| round_money(base_price))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn two_games_plus_distance() {
        let lines = vec![
            LineInput {
                game_id: 2,
                quantity: 1,
                unit_price: money(35000),
            },
            LineInput {
                game_id: 1,
                quantity: 1,
                unit_price: money(30000),
            },
        ];
        let priced = price_reservation(&lines, Some(Decimal::new(123, 1)));

        assert_eq!(priced.distance_price, Some(money(12300)));
        assert_eq!(priced.total, money(77300));
        assert_eq!(priced.lines[0].game_id, 1);
    }

    #[test]
    fn no_distance_means_no_surcharge() {
        let lines = vec![LineInput {
            game_id: 5,
            quantity: 3,
            unit_price: Decimal::new(1999, 2),
        }];
        let priced = price_reservation(&lines, None);

        assert_eq!(priced.distance_price, None);
        assert_eq!(priced.lines[0].subtotal, Decimal::new(5997, 2));
        assert_eq!(priced.total, Decimal::new(5997, 2));
    }

    #[test]
    fn surcharge_rounds_half_up_to_whole_pesos() {
        assert_eq!(distance_surcharge(Decimal::new(12345, 4)), money(1235));
        assert_eq!(distance_surcharge(Decimal::new(12344, 4)), money(1234));
        assert_eq!(distance_surcharge(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn stored_distance_keeps_the_surcharge() {
        for raw in [
            Decimal::new(12345, 3),
            Decimal::new(123456, 4),
            Decimal::new(123455, 4),
            Decimal::new(7, 2),
        ] {
            assert_eq!(distance_surcharge(round_distance(raw)), distance_surcharge(raw));
        }
        assert_eq!(round_distance(Decimal::new(12345, 3)), Decimal::new(12345, 3));
        assert_eq!(distance_surcharge(Decimal::new(12345, 3)), money(12345));
    }

    #[test]
    fn total_matches_sum_of_subtotals() {
        let lines: Vec<LineInput> = (1..=4)
            .map(|i| LineInput {
                game_id: i,
                quantity: i,
                unit_price: Decimal::new(1234 * i as i64, 1),
            })
            .collect();
        let priced = price_reservation(&lines, Some(Decimal::new(75, 1)));
        let recomputed = total_from_subtotals(
            priced.lines.iter().map(|line| line.subtotal),
            priced.distance_price,
        );
        assert_eq!(priced.total, recomputed);
        for line in &priced.lines {
            assert_eq!(line.subtotal, line.unit_price * Decimal::from(line.quantity));
        }
    }

    #[test]
    fn base_price_without_windows() {
        assert_eq!(effective_price(money(30000), &[], date(2025, 12, 1)), money(30000));
    }

    #[test]
    fn latest_window_wins_then_largest_discount() {
        let windows = vec![
            SeasonalWindow {
                start_date: date(2025, 12, 1),
                end_date: date(2026, 2, 28),
                rental_price: money(40000),
                discount_percent: Decimal::ZERO,
            },
            SeasonalWindow {
                start_date: date(2025, 12, 15),
                end_date: date(2025, 12, 31),
                rental_price: money(40000),
                discount_percent: money(10),
            },
            SeasonalWindow {
                start_date: date(2025, 12, 15),
                end_date: date(2025, 12, 20),
                rental_price: money(40000),
                discount_percent: money(25),
            },
        ];

        assert_eq!(effective_price(money(30000), &windows, date(2025, 12, 10)), money(40000));
        assert_eq!(effective_price(money(30000), &windows, date(2025, 12, 18)), money(30000));
        assert_eq!(effective_price(money(30000), &windows, date(2025, 12, 25)), money(36000));
        assert_eq!(effective_price(money(30000), &windows, date(2026, 3, 1)), money(30000));
    }

    #[test]
    fn discount_rounds_half_up() {
        let window = SeasonalWindow {
            start_date: date(2025, 1, 1),
            end_date: date(2025, 1, 31),
            rental_price: Decimal::new(1005, 2),
            discount_percent: money(50),
        };
        // 10.05 * 0.5 = 5.025
        assert_eq!(window.discounted_price(), Decimal::new(503, 2));
    }
}
