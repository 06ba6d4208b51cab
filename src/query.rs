use crate::config::CrawlConfig;
use crate::error::ConfigError;
use crate::models::SearchQuery;

const CATEGORY_PATH: &str = "s-haus-kaufen";
const CATEGORY_ID: &str = "c208";
const GROUND_SIZE_ATTRIBUTE: &str = "haus_kaufen.grundstuecksflaeche_d";

impl SearchQuery {
    /// Renders the result-page URL. Unset bounds become empty segments,
    /// which the site reads as unbounded.
    pub fn to_url(&self, base_url: &str) -> String {
        let separator = urlencoding::encode(",");
        format!(
            "{base}/{category}/{region}/preis:{price_min}:{price_max}/{category_id}l{code}r{distance}+{attribute}:{ground_min}{separator}{ground_max}",
            base = base_url.trim_end_matches('/'),
            category = CATEGORY_PATH,
            region = self.region,
            price_min = self.price_min.as_deref().unwrap_or_default(),
            price_max = self.price_max.as_deref().unwrap_or_default(),
            category_id = CATEGORY_ID,
            code = self.category_region_code,
            distance = self.distance_km,
            attribute = GROUND_SIZE_ATTRIBUTE,
            ground_min = self.ground_size_min.as_deref().unwrap_or_default(),
            ground_max = self.ground_size_max.as_deref().unwrap_or_default(),
        )
    }
}

/// A query together with its rendered URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub query: SearchQuery,
    pub url: String,
}

pub fn build_queries(config: &CrawlConfig) -> Result<Vec<SearchQuery>, ConfigError> {
    if config.regions.len() != config.category_region_codes.len() {
        return Err(ConfigError::MismatchedRegionCodes {
            regions: config.regions.len(),
            codes: config.category_region_codes.len(),
        });
    }

    Ok(config
        .regions
        .iter()
        .zip(&config.category_region_codes)
        .map(|(region, code)| SearchQuery {
            region: region.clone(),
            category_region_code: code.clone(),
            price_min: config.price_min.clone(),
            price_max: config.price_max.clone(),
            distance_km: config.distance_km,
            ground_size_min: config.ground_size_min.clone(),
            ground_size_max: config.ground_size_max.clone(),
        })
        .collect())
}

pub fn build_targets(config: &CrawlConfig) -> Result<Vec<QueryTarget>, ConfigError> {
    Ok(build_queries(config)?
        .into_iter()
        .map(|query| {
            let url = query.to_url(&config.base_url);
            QueryTarget { query, url }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regions: &[&str], codes: &[&str]) -> CrawlConfig {
        CrawlConfig {
            base_url: "https://www.ebay-kleinanzeigen.de".to_string(),
            regions: regions.iter().map(|s| s.to_string()).collect(),
            category_region_codes: codes.iter().map(|s| s.to_string()).collect(),
            ..CrawlConfig::default()
        }
    }

    #[test]
    fn unbounded_filters_leave_empty_segments() {
        let urls: Vec<String> = build_targets(&config(&["region1"], &["1354"]))
            .unwrap()
            .into_iter()
            .map(|t| t.url)
            .collect();

        assert_eq!(
            urls,
            vec!["https://www.ebay-kleinanzeigen.de/s-haus-kaufen/region1/preis::/c208l1354r20+haus_kaufen.grundstuecksflaeche_d:%2C"]
        );
    }

    #[test]
    fn one_url_per_region_in_order() {
        let mut config = config(&["region1", "region2", "region3"], &["1354", "1354", "1354"]);
        config.price_max = Some("300000".to_string());
        config.distance_km = 27;
        config.ground_size_min = Some("2000".to_string());
        config.ground_size_max = Some("50000".to_string());

        let urls: Vec<String> = build_targets(&config)
            .unwrap()
            .into_iter()
            .map(|t| t.url)
            .collect();

        assert_eq!(
            urls,
            vec![
                "https://www.ebay-kleinanzeigen.de/s-haus-kaufen/region1/preis::300000/c208l1354r27+haus_kaufen.grundstuecksflaeche_d:2000%2C50000",
                "https://www.ebay-kleinanzeigen.de/s-haus-kaufen/region2/preis::300000/c208l1354r27+haus_kaufen.grundstuecksflaeche_d:2000%2C50000",
                "https://www.ebay-kleinanzeigen.de/s-haus-kaufen/region3/preis::300000/c208l1354r27+haus_kaufen.grundstuecksflaeche_d:2000%2C50000",
            ]
        );
    }

    #[test]
    fn codes_pair_with_regions_by_position() {
        let targets = build_targets(&config(&["olsberg", "iserlohn"], &["1354", "1735"])).unwrap();

        assert_eq!(targets[0].query.category_region_code, "1354");
        assert!(targets[0].url.contains("/olsberg/"));
        assert!(targets[1].url.contains("c208l1735r20"));
        assert!(targets[1].url.contains("/iserlohn/"));
    }

    #[test]
    fn mismatched_lists_are_rejected() {
        let err = build_targets(&config(&["a", "b"], &["1"])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MismatchedRegionCodes { regions: 2, codes: 1 }
        ));
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let mut config = config(&["solingen"], &["2117"]);
        config.base_url = "https://www.kleinanzeigen.de/".to_string();
        let targets = build_targets(&config).unwrap();
        assert!(targets[0].url.starts_with("https://www.kleinanzeigen.de/s-haus-kaufen/solingen/"));
    }
}
