use thiserror::Error;

/// A point threshold mapped to the role a member earns on reaching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTier {
    pub threshold: u64,
    pub role_id: u64,
    /// Short rank name shown in the leaderboard footer.
    pub label: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierParseError {
    #[error("Tier entry `{0}` must look like `threshold:role_id[:label]`")]
    Malformed(String),

    #[error("Tier entry `{entry}` has an invalid number: {reason}")]
    InvalidNumber { entry: String, reason: String },

    #[error("Threshold {0} is listed more than once")]
    DuplicateThreshold(u64),

    #[error("At least one role tier is required")]
    Empty,
}

/// The configured tiers, always kept in ascending threshold order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<RoleTier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<RoleTier>) -> Result<Self, TierParseError> {
        if tiers.is_empty() {
            return Err(TierParseError::Empty);
        }
        tiers.sort_by_key(|t| t.threshold);
        if let Some(pair) = tiers.windows(2).find(|w| w[0].threshold == w[1].threshold) {
            return Err(TierParseError::DuplicateThreshold(pair[0].threshold));
        }
        Ok(Self { tiers })
    }

    /// Parse `threshold:role_id[:label]` entries separated by commas.
    /// A missing label falls back to the threshold itself.
    pub fn parse(raw: &str) -> Result<Self, TierParseError> {
        let mut tiers = Vec::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let mut parts = entry.splitn(3, ':');
            let (threshold, role_id) = match (parts.next(), parts.next()) {
                (Some(t), Some(r)) => (t.trim(), r.trim()),
                _ => return Err(TierParseError::Malformed(entry.to_string())),
            };
            let parse = |value: &str| {
                value
                    .parse::<u64>()
                    .map_err(|e| TierParseError::InvalidNumber {
                        entry: entry.to_string(),
                        reason: e.to_string(),
                    })
            };
            let threshold = parse(threshold)?;
            let role_id = parse(role_id)?;
            let label = parts
                .next()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| threshold.to_string());

            tiers.push(RoleTier {
                threshold,
                role_id,
                label,
            });
        }

        Self::new(tiers)
    }

    /// The clan ranks the bot was originally configured with.
    pub fn clan_ranks() -> Self {
        let ranks: [(u64, u64, &str); 7] = [
            (500, 710975465678045226, "Peasants"),
            (1_500, 710975161314181174, "Artisans"),
            (5_000, 710974719448449118, "Hatamoto"),
            (10_000, 710974492566093867, "Daimyo"),
            (25_000, 710972777170993164, "Ronin"),
            (50_000, 710973545773138030, "Bushi"),
            (100_000, 710969412093476925, "Samurai"),
        ];

        Self {
            tiers: ranks
                .into_iter()
                .map(|(threshold, role_id, label)| RoleTier {
                    threshold,
                    role_id,
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleTier> {
        self.tiers.iter()
    }

    /// Every tier a member with `total` points qualifies for.
    pub fn satisfied_by(&self, total: u64) -> impl Iterator<Item = &RoleTier> {
        self.tiers.iter().take_while(move |t| total >= t.threshold)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clan_ranks_are_ascending() {
        let table = TierTable::clan_ranks();
        let thresholds: Vec<u64> = table.iter().map(|t| t.threshold).collect();
        assert_eq!(
            thresholds,
            vec![500, 1_500, 5_000, 10_000, 25_000, 50_000, 100_000]
        );
    }

    #[test]
    fn satisfied_by_stops_at_the_first_unmet_threshold() {
        let table = TierTable::clan_ranks();
        assert_eq!(table.satisfied_by(499).count(), 0);
        assert_eq!(table.satisfied_by(500).count(), 1);
        assert_eq!(table.satisfied_by(12_000).count(), 4);
        assert_eq!(table.satisfied_by(u64::MAX).count(), table.len());
    }

    #[test]
    fn parse_sorts_and_defaults_labels() {
        let table = TierTable::parse("1500:22:Artisans, 500:11").unwrap();
        let tiers: Vec<&RoleTier> = table.iter().collect();
        assert_eq!(tiers[0].threshold, 500);
        assert_eq!(tiers[0].role_id, 11);
        assert_eq!(tiers[0].label, "500");
        assert_eq!(tiers[1].label, "Artisans");
    }

    #[test]
    fn parse_rejects_bad_entries() {
        assert_eq!(
            TierParseError::Malformed("500".into()),
            TierTable::parse("500").unwrap_err()
        );
        assert!(matches!(
            TierTable::parse("abc:12"),
            Err(TierParseError::InvalidNumber { .. })
        ));
        assert_eq!(
            TierTable::parse("500:1,500:2").unwrap_err(),
            TierParseError::DuplicateThreshold(500)
        );
        assert_eq!(TierTable::parse(" , ").unwrap_err(), TierParseError::Empty);
    }
}
