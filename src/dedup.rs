use crate::extractor::absolute_url;
use crate::models::{Ledger, Offer, RawListingRecord};
use tracing::debug;

/// Picks the records that are new to the ledger and within `max_distance_km`.
///
/// Titles are compared after trimming. An accepted title is remembered right
/// away, so a listing repeated on the same page is only taken once. Records
/// with an unknown distance never pass the filter.
pub fn find_new_offers(
    ledger: &Ledger,
    records: &[RawListingRecord],
    max_distance_km: u32,
    timestamp: &str,
    base_url: &str,
) -> Vec<Offer> {
    let mut known_titles = ledger.known_titles();
    let mut offers = Vec::new();

    for record in records {
        let title = record.title_text.trim();

        if known_titles.contains(title) {
            debug!(title, "Skipping already known listing");
            continue;
        }

        match record.distance_km {
            Some(distance) if distance <= max_distance_km => {}
            other => {
                debug!(title, distance = ?other, max_distance_km, "Skipping listing outside radius");
                continue;
            }
        }

        known_titles.insert(title.to_string());
        offers.push(Offer::new(
            timestamp,
            title,
            &absolute_url(base_url, &record.href_path),
            &record.price_text,
        ));
    }

    offers
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-05-01 08:00:00";
    const BASE: &str = "https://www.kleinanzeigen.de";

    fn record(title: &str, price: &str, distance: Option<u32>) -> RawListingRecord {
        RawListingRecord {
            title_text: title.to_string(),
            price_text: price.to_string(),
            href_path: format!("/s-anzeige/{}", title.trim().to_lowercase().replace(' ', "-")),
            distance_km: distance,
        }
    }

    fn ledger_with(titles: &[&str]) -> Ledger {
        Ledger::from_offers(
            titles
                .iter()
                .map(|t| Offer::new("2024-04-01 08:00:00", t, "https://x/1", "1 €"))
                .collect(),
        )
    }

    #[test]
    fn known_title_is_not_reemitted_even_if_price_changed() {
        let ledger = ledger_with(&["Haus am Wald"]);
        let records = vec![record("  Haus am Wald ", "150.000 €", Some(5))];

        assert!(find_new_offers(&ledger, &records, 20, TS, BASE).is_empty());
    }

    #[test]
    fn ledger_titles_are_trimmed_before_comparison() {
        let ledger = Ledger::from_offers(vec![Offer {
            timestamp: TS.to_string(),
            price: "1 €".to_string(),
            title: "  Resthof\n".to_string(),
            url: "https://x/2".to_string(),
        }]);
        let records = vec![record("Resthof", "1 €", Some(1))];

        assert!(find_new_offers(&ledger, &records, 20, TS, BASE).is_empty());
    }

    #[test]
    fn distance_threshold_is_inclusive() {
        let records = vec![
            record("Exactly at radius", "1 €", Some(20)),
            record("One beyond radius", "1 €", Some(21)),
        ];

        let offers = find_new_offers(&Ledger::new(), &records, 20, TS, BASE);

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].title, "Exactly at radius");
    }

    #[test]
    fn unknown_distance_is_rejected() {
        let records = vec![record("Somewhere", "1 €", None)];
        assert!(find_new_offers(&Ledger::new(), &records, 20, TS, BASE).is_empty());
    }

    #[test]
    fn duplicate_titles_on_one_page_yield_one_offer() {
        let records = vec![
            record("Bauernhaus", "100.000 €", Some(3)),
            record(" Bauernhaus", "90.000 €", Some(3)),
        ];

        let offers = find_new_offers(&Ledger::new(), &records, 20, TS, BASE);

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, "100.000 €");
    }

    #[test]
    fn out_of_radius_duplicate_does_not_shadow_later_match() {
        let records = vec![
            record("Villa", "1 €", Some(50)),
            record("Villa", "2 €", Some(10)),
        ];

        let offers = find_new_offers(&Ledger::new(), &records, 20, TS, BASE);

        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].price, "2 €");
    }

    #[test]
    fn offers_keep_document_order_and_are_stamped() {
        let records = vec![
            record("B", "1 €", Some(1)),
            record("A", "2 €", Some(2)),
            record("C", "3 €", Some(3)),
        ];

        let offers = find_new_offers(&ledger_with(&["A"]), &records, 20, TS, BASE);

        let titles: Vec<&str> = offers.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "C"]);
        assert!(offers.iter().all(|o| o.timestamp == TS));
        assert_eq!(offers[0].url, "https://www.kleinanzeigen.de/s-anzeige/b");
    }
}
