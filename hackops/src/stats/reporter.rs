//! Organizer statistics.
//!
//! Every grouped statistic is a row in one of the definition tables below;
//! adding a dashboard chart means adding a row. Each call recomputes from the
//! current records.

use super::aggregation::{aggregate, collect_free_text, Aggregation, FreeText, GroupRow};
use super::records::{
    ApplicationField, ApplicationRecord, AttendanceField, AttendanceRecord, BagField,
    ReimbursementField, ReimbursementRecord,
};
use crate::stores::{BaggageStore, StatsSource, StoreError};
use crate::types::Bag;
use chrono::{DateTime, Utc};
use hackops_core::environment::Clock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Statistics failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// A record source failed
    #[error("Failed to load records: {0}")]
    Source(#[from] StoreError),
}

/// Grouped statistics over applications.
#[must_use]
pub fn application_aggregations(min_group_size: u64) -> Vec<Aggregation<ApplicationRecord>> {
    use ApplicationField as F;
    type A = Aggregation<ApplicationRecord>;
    vec![
        A::count("status", F::Status),
        A::count("shirt_count", F::TshirtSize),
        A::count("shirt_count_confirmed", F::TshirtSize)
            .filtered(ApplicationRecord::is_confirmed),
        A::count("timeseries", F::SubmissionDate),
        A::count("gender", F::Gender),
        A::count("gender_attended", F::Gender).filtered(ApplicationRecord::has_attended),
        A::count("major_count", F::Degree).suppress_small_groups(min_group_size),
        A::count("major_count_attended", F::Degree)
            .filtered(ApplicationRecord::has_attended)
            .suppress_small_groups(min_group_size),
        A::count("class", F::ClassStatus).filtered(ApplicationRecord::is_not_mentor),
        A::count("class_attended", F::ClassStatus)
            .filtered(|a| a.has_attended() && a.is_not_mentor()),
        A::count("hearabout_count", F::HearAbout),
        A::count("attendance_type_count", F::AttendanceType),
        A::count("firsttimer_count", F::FirstTimer),
        A::count("firsttimer_count_attended", F::FirstTimer)
            .filtered(ApplicationRecord::has_attended),
        A::count("diet", F::Diet),
        A::count("diet_confirmed", F::Diet).filtered(ApplicationRecord::is_confirmed),
    ]
}

/// Free-text statistics over applications.
#[must_use]
pub fn application_free_text() -> Vec<FreeText<ApplicationRecord>> {
    vec![
        FreeText {
            name: "other_diet",
            field: ApplicationField::OtherDiet,
            filter: Some(ApplicationRecord::is_confirmed),
        },
        FreeText {
            name: "hardware",
            field: ApplicationField::Hardware,
            filter: None,
        },
    ]
}

fn reimbursement_status() -> Aggregation<ReimbursementRecord> {
    Aggregation::<ReimbursementRecord>::count("status", ReimbursementField::Status)
}

fn reimbursement_amounts() -> [Aggregation<ReimbursementRecord>; 2] {
    type A = Aggregation<ReimbursementRecord>;
    let not_draft: fn(&ReimbursementRecord) -> bool = |r| !r.is_draft();
    [
        A::sum("final_amount", ReimbursementField::Status, ReimbursementField::FinalAmount)
            .filtered(not_draft),
        A::sum("max_amount", ReimbursementField::Status, ReimbursementField::MaxAmount)
            .filtered(not_draft),
    ]
}

fn bag_aggregations() -> [Aggregation<Bag>; 3] {
    type A = Aggregation<Bag>;
    [
        A::count("status", BagField::Status),
        A::count("active_by_room", BagField::Room).filtered(Bag::is_active),
        A::count("active_by_type", BagField::Category).filtered(Bag::is_active),
    ]
}

fn evaluate<R: super::aggregation::Groupable>(
    records: &[R],
    aggregations: &[Aggregation<R>],
) -> BTreeMap<&'static str, Vec<GroupRow>> {
    aggregations
        .iter()
        .map(|a| (a.name, aggregate(records, a)))
        .collect()
}

// ============================================================================
// Responses
// ============================================================================

/// `GET /api/stats/apps`
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationStats {
    /// When this was computed
    pub update_time: DateTime<Utc>,
    /// Submitted applications
    pub app_count: usize,
    /// Unsubmitted drafts
    pub draft_app_count: u64,
    /// Grouped statistics by name
    #[serde(flatten)]
    pub groups: BTreeMap<&'static str, Vec<GroupRow>>,
    /// Free-text statistics by name
    #[serde(flatten)]
    pub free_text: BTreeMap<&'static str, String>,
}

/// Applications with and without a reimbursement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReimbursementDemand {
    /// Applications with a reimbursement
    #[serde(rename = "Reimbursement needed")]
    pub needed: u64,
    /// Applications without one
    #[serde(rename = "No reimbursement")]
    pub not_needed: u64,
}

/// Summed amounts of one reimbursement status (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmountRow {
    /// Status code
    pub key: Option<String>,
    /// Status name
    pub name: Option<&'static str>,
    /// Sum of assigned amounts
    pub final_amount: i64,
    /// Sum of maximum amounts
    pub max_amount: i64,
}

/// `GET /api/stats/reimb`
#[derive(Debug, Clone, Serialize)]
pub struct ReimbursementStats {
    /// When this was computed
    pub update_time: DateTime<Utc>,
    /// All reimbursements, drafts included
    pub reimb_count: u64,
    /// Split of applications
    pub reimb_apps: ReimbursementDemand,
    /// Reimbursements per status
    pub status: Vec<GroupRow>,
    /// Amounts per status, drafts excluded
    pub amounts: Vec<AmountRow>,
}

/// Attendance of one workshop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkshopAttendance {
    /// Workshop title
    pub title: String,
    /// Attendees scanned in
    pub attendance: i64,
}

/// `GET /api/stats/workshops`
#[derive(Debug, Clone, Serialize)]
pub struct WorkshopStats {
    /// When this was computed
    pub update_time: DateTime<Utc>,
    /// Every workshop, including ones nobody attended
    pub workshops: Vec<WorkshopAttendance>,
}

/// `GET /api/stats/baggage`
#[derive(Debug, Clone, Serialize)]
pub struct BaggageStats {
    /// When this was computed
    pub update_time: DateTime<Utc>,
    /// Grouped statistics by name
    #[serde(flatten)]
    pub groups: BTreeMap<&'static str, Vec<GroupRow>>,
}

// ============================================================================
// Reporter
// ============================================================================

/// Computes the organizer statistics from the record stores.
pub struct StatsReporter {
    source: Arc<dyn StatsSource>,
    baggage: Arc<dyn BaggageStore>,
    clock: Arc<dyn Clock>,
    min_group_size: u64,
}

impl StatsReporter {
    /// Creates a new reporter. Groups of `min_group_size` respondents or fewer
    /// are left out of the degree breakdowns.
    #[must_use]
    pub fn new(
        source: Arc<dyn StatsSource>,
        baggage: Arc<dyn BaggageStore>,
        clock: Arc<dyn Clock>,
        min_group_size: u64,
    ) -> Self {
        Self {
            source,
            baggage,
            clock,
            min_group_size,
        }
    }

    /// Application statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Source`] if the records cannot be loaded.
    pub async fn application_stats(&self) -> Result<ApplicationStats, StatsError> {
        let applications = self.source.applications().await?;
        let draft_app_count = self.source.draft_application_count().await?;

        let groups = evaluate(&applications, &application_aggregations(self.min_group_size));
        let free_text = application_free_text()
            .iter()
            .map(|definition| (definition.name, collect_free_text(&applications, definition)))
            .collect();

        Ok(ApplicationStats {
            update_time: self.clock.now(),
            app_count: applications.len(),
            draft_app_count,
            groups,
            free_text,
        })
    }

    /// Reimbursement statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Source`] if the records cannot be loaded.
    pub async fn reimbursement_stats(&self) -> Result<ReimbursementStats, StatsError> {
        let reimbursements = self.source.reimbursements().await?;
        let app_count = u64::try_from(self.source.applications().await?.len()).unwrap_or(u64::MAX);
        let reimb_count = u64::try_from(reimbursements.len()).unwrap_or(u64::MAX);

        let [final_amounts, max_amounts] =
            reimbursement_amounts().map(|a| aggregate(&reimbursements, &a));
        let mut amounts: BTreeMap<Option<String>, AmountRow> = BTreeMap::new();
        for row in final_amounts {
            amounts.insert(
                row.key.clone(),
                AmountRow {
                    key: row.key,
                    name: row.name,
                    final_amount: row.value,
                    max_amount: 0,
                },
            );
        }
        for row in max_amounts {
            amounts
                .entry(row.key.clone())
                .or_insert_with(|| AmountRow {
                    key: row.key,
                    name: row.name,
                    final_amount: 0,
                    max_amount: 0,
                })
                .max_amount = row.value;
        }

        Ok(ReimbursementStats {
            update_time: self.clock.now(),
            reimb_count,
            reimb_apps: ReimbursementDemand {
                needed: reimb_count,
                not_needed: app_count.saturating_sub(reimb_count),
            },
            status: aggregate(&reimbursements, &reimbursement_status()),
            amounts: amounts.into_values().collect(),
        })
    }

    /// Workshop attendance.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Source`] if the records cannot be loaded.
    pub async fn workshop_stats(&self) -> Result<WorkshopStats, StatsError> {
        let workshops = self.source.workshops().await?;
        let attendance: Vec<AttendanceRecord> = self.source.workshop_attendance().await?;

        let per_workshop: HashMap<String, i64> = aggregate(
            &attendance,
            &Aggregation::<AttendanceRecord>::count("attendance", AttendanceField::Workshop),
        )
        .into_iter()
        .filter_map(|row| row.key.map(|key| (key, row.value)))
        .collect();

        Ok(WorkshopStats {
            update_time: self.clock.now(),
            workshops: workshops
                .into_iter()
                .map(|w| WorkshopAttendance {
                    attendance: per_workshop.get(&w.id.to_string()).copied().unwrap_or(0),
                    title: w.title,
                })
                .collect(),
        })
    }

    /// Baggage statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::Source`] if the bags cannot be loaded.
    pub async fn baggage_stats(&self) -> Result<BaggageStats, StatsError> {
        let bags = self.baggage.all_bags().await?;
        Ok(BaggageStats {
            update_time: self.clock.now(),
            groups: evaluate(&bags, &bag_aggregations()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stats::records::ReimbursementRecord;
    use crate::stores::{InMemoryBaggageStore, InMemoryStatsSource};
    use hackops_testing::test_clock;

    fn reporter(source: &InMemoryStatsSource) -> StatsReporter {
        StatsReporter::new(
            Arc::new(source.clone()),
            Arc::new(InMemoryBaggageStore::new()),
            Arc::new(test_clock()),
            5,
        )
    }

    #[test]
    fn statistic_names_are_unique() {
        let mut names: Vec<&str> = application_aggregations(5).iter().map(|a| a.name).collect();
        names.extend(application_free_text().iter().map(|f| f.name));
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[tokio::test]
    async fn mentors_are_left_out_of_class_breakdown() {
        let source = InMemoryStatsSource::new();
        let mut mentor = ApplicationRecord::with_status("A", test_clock().now());
        mentor.kind = crate::stats::records::ApplicationKind::Mentor;
        mentor.class_status = Some("G".to_string());
        let mut hacker = ApplicationRecord::with_status("A", test_clock().now());
        hacker.class_status = Some("2".to_string());
        source.add_application(mentor).await;
        source.add_application(hacker).await;

        let stats = reporter(&source).application_stats().await.unwrap();

        let class = &stats.groups["class"];
        assert_eq!(class.len(), 1);
        assert_eq!(class[0].key.as_deref(), Some("2"));
        assert_eq!(class[0].name, Some("Second year"));
        assert_eq!(stats.groups["gender_attended"][0].value, 2);
    }

    #[tokio::test]
    async fn reimbursement_amounts_skip_drafts() {
        let source = InMemoryStatsSource::new();
        for _ in 0..4 {
            source
                .add_application(ApplicationRecord::with_status("P", test_clock().now()))
                .await;
        }
        for (status, final_amount, max_amount) in
            [("D", Some(100), Some(200)), ("A", Some(5_000), Some(6_000)), ("A", None, Some(1_000))]
        {
            source
                .add_reimbursement(ReimbursementRecord {
                    status: status.to_string(),
                    final_amount,
                    max_amount,
                })
                .await;
        }

        let stats = reporter(&source).reimbursement_stats().await.unwrap();

        assert_eq!(stats.reimb_count, 3);
        assert_eq!(stats.reimb_apps, ReimbursementDemand { needed: 3, not_needed: 1 });
        assert_eq!(stats.status.len(), 2);
        assert_eq!(
            stats.amounts,
            vec![AmountRow {
                key: Some("A".to_string()),
                name: Some("Accepted"),
                final_amount: 5_000,
                max_amount: 7_000,
            }]
        );
    }

    #[tokio::test]
    async fn reimbursement_demand_uses_display_labels() {
        let source = InMemoryStatsSource::new();
        source
            .add_application(ApplicationRecord::with_status("P", test_clock().now()))
            .await;
        source
            .add_reimbursement(ReimbursementRecord {
                status: "A".to_string(),
                final_amount: Some(10),
                max_amount: Some(20),
            })
            .await;

        let stats = reporter(&source).reimbursement_stats().await.unwrap();
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["reimb_apps"]["Reimbursement needed"], 1);
        assert_eq!(json["reimb_apps"]["No reimbursement"], 0);
        assert!(json["reimb_apps"].get("needed").is_none());
    }

    #[tokio::test]
    async fn huge_reimbursement_totals_saturate() {
        let source = InMemoryStatsSource::new();
        for _ in 0..2 {
            source
                .add_reimbursement(ReimbursementRecord {
                    status: "A".to_string(),
                    final_amount: Some(i64::MAX),
                    max_amount: Some(i64::MAX),
                })
                .await;
        }

        let stats = reporter(&source).reimbursement_stats().await.unwrap();

        assert_eq!(stats.amounts[0].final_amount, i64::MAX);
        assert_eq!(stats.amounts[0].max_amount, i64::MAX);
    }

    #[tokio::test]
    async fn workshops_without_attendees_are_listed() {
        let source = InMemoryStatsSource::new();
        source
            .add_workshop(crate::stats::records::WorkshopRecord { id: 1, title: "Rust 101".into() })
            .await;
        source
            .add_workshop(crate::stats::records::WorkshopRecord { id: 2, title: "Soldering".into() })
            .await;
        source.add_attendance(1).await;
        source.add_attendance(1).await;

        let stats = reporter(&source).workshop_stats().await.unwrap();

        assert_eq!(
            stats.workshops,
            vec![
                WorkshopAttendance { title: "Rust 101".into(), attendance: 2 },
                WorkshopAttendance { title: "Soldering".into(), attendance: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn response_fields_are_flat() {
        let source = InMemoryStatsSource::new();
        let stats = reporter(&source).application_stats().await.unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        for field in ["update_time", "app_count", "draft_app_count", "status", "timeseries", "major_count", "other_diet", "hardware"] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
