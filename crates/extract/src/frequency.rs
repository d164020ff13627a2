//! Mutable frequency counters, merged commutatively at aggregation time.

use std::collections::{BTreeMap, BTreeSet};

use gsatvocab_model::{AnnotationRole, ExamType, FrequencyData, SectionType};

#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    years: BTreeSet<i16>,
    by_role: BTreeMap<String, u32>,
    by_section: BTreeMap<String, u32>,
    by_exam_type: BTreeMap<String, u32>,
    tested_count: u32,
    active_tested_count: u32,
    total: u32,
}

impl FrequencyCounter {
    pub fn add(
        &mut self,
        year: i16,
        role: Option<AnnotationRole>,
        section: SectionType,
        exam_type: ExamType,
    ) {
        self.years.insert(year);
        let role_key = role.map(|r| r.as_str()).unwrap_or("none");
        *self.by_role.entry(role_key.to_string()).or_default() += 1;
        *self
            .by_section
            .entry(section.as_str().to_string())
            .or_default() += 1;
        *self
            .by_exam_type
            .entry(exam_type.as_str().to_string())
            .or_default() += 1;
        self.total += 1;

        if role.is_some_and(AnnotationRole::is_tested) {
            self.tested_count += 1;
        }
        if role.is_some_and(AnnotationRole::is_active_tested) {
            self.active_tested_count += 1;
        }
    }

    pub fn merge(&mut self, other: &FrequencyCounter) {
        self.years.extend(&other.years);
        for (k, v) in &other.by_role {
            *self.by_role.entry(k.clone()).or_default() += v;
        }
        for (k, v) in &other.by_section {
            *self.by_section.entry(k.clone()).or_default() += v;
        }
        for (k, v) in &other.by_exam_type {
            *self.by_exam_type.entry(k.clone()).or_default() += v;
        }
        self.tested_count += other.tested_count;
        self.active_tested_count += other.active_tested_count;
        self.total += other.total;
    }

    pub fn tested_count(&self) -> u32 {
        self.tested_count
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn to_frequency_data(&self) -> FrequencyData {
        FrequencyData {
            total_appearances: self.total,
            tested_count: self.tested_count,
            active_tested_count: self.active_tested_count,
            year_spread: self.years.len() as u32,
            years: self.years.iter().copied().collect(),
            by_role: self.by_role.clone(),
            by_section: self.by_section.clone(),
            by_exam_type: self.by_exam_type.clone(),
        }
    }
}
