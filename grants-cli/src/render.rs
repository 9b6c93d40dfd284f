//! Plain-text rendering of command results.

use std::fmt::Write;

use grants_core::calculations::{
    Amount, ContributionReport, GrantKind, GrantShareLookup, format_currency,
};
use grants_core::{GlobalAffairsGrant, Grant};
use rust_decimal::Decimal;

use crate::app::{SearchResults, StatsReport};
use crate::utils::format_percentage;

const RULE: &str = "------------------------------------------------------------";

fn heading(
    out: &mut String,
    title: &str,
) {
    let _ = writeln!(out, "\n{title}\n{RULE}");
}

fn line(
    out: &mut String,
    label: &str,
    annual: &Amount,
    monthly: &Amount,
) {
    let _ = writeln!(out, "{label:<28}{:>18}{:>16}/mo", annual.formatted, monthly.formatted);
}

fn kind_label(kind: GrantKind) -> &'static str {
    match kind {
        GrantKind::Domestic => "domestic",
        GrantKind::Gac => "GAC",
    }
}

pub fn render_report(report: &ContributionReport) -> String {
    let calc = &report.calculation;
    let mut out = String::new();

    heading(&mut out, "Your tax contribution");
    line(&mut out, "Annual income", &calc.annual_income, &calc.monthly_income);
    line(
        &mut out,
        "GST-eligible spending",
        &calc.gst_eligible_spending,
        &calc.monthly_gst_spending,
    );
    line(&mut out, "Federal income tax", &calc.federal_income_tax, &calc.monthly_federal_tax);
    line(&mut out, "GST paid", &calc.gst_paid, &calc.monthly_gst_paid);
    line(
        &mut out,
        "Total tax contribution",
        &calc.total_tax_contribution,
        &calc.monthly_tax_contribution,
    );
    line(&mut out, "Grants portion", &calc.grants_portion_of_taxes, &calc.monthly_grants_portion);
    let _ = writeln!(
        out,
        "Share of federal revenue: {}  (grants allocation {})",
        format_percentage(calc.revenue_share_percentage, 8),
        format_percentage(calc.grants_allocation_percentage, 2)
    );

    heading(&mut out, "Featured grants");
    if report.grant_shares.is_empty() {
        let _ = writeln!(out, "(no notable or major grants)");
    }
    for share in &report.grant_shares {
        let _ = writeln!(
            out,
            "[{}] {} - {}\n    {} ({}), value {}, your share {}",
            kind_label(share.grant_type),
            share.title,
            share.recipient,
            share.category,
            share.fiscal_year,
            share.total_value.formatted,
            share.user_share.formatted
        );
    }

    heading(&mut out, &format!("Contributions since {}", calc.taxpayer_since_year));
    for year in &report.yearly_breakdown {
        let _ = writeln!(
            out,
            "{}  {:>14}  ({} grants: {} domestic, {} GAC)",
            year.year,
            year.total_contribution.formatted,
            year.grant_count,
            year.domestic_count,
            year.gac_count
        );
    }

    let projections = &report.future_projections;
    heading(&mut out, "Projections");
    let _ = writeln!(
        out,
        "Historical average: {} across {} grants per year",
        projections.historical_average.formatted, projections.historical_average_count
    );
    for (year, projected) in &projections.with_new_projects {
        let continuing = projections
            .continuing_only
            .get(year)
            .map(|p| p.total_contribution.formatted.clone())
            .unwrap_or_else(|| format_currency(Decimal::ZERO));
        let _ = writeln!(
            out,
            "{year}  continuing {continuing:>12}  with new projects {:>12}",
            projected.total_contribution.formatted
        );
    }

    let totals = &report.totals;
    heading(&mut out, "Totals");
    let _ = writeln!(out, "All grants value:  {}", totals.total_grants_value.formatted);
    let _ = writeln!(
        out,
        "Your share:        {} ({}/mo)",
        totals.total_grants_share.formatted, totals.monthly_grants_share.formatted
    );
    let _ = writeln!(
        out,
        "  domestic {} ({}), GAC {} ({})",
        totals.breakdown.domestic.share.formatted,
        format_percentage(totals.breakdown.domestic.percentage, 1),
        totals.breakdown.gac.share.formatted,
        format_percentage(totals.breakdown.gac.percentage, 1)
    );
    if !report.include_gac {
        let _ = writeln!(out, "(GAC projects excluded)");
    }

    out
}

pub fn render_share(share: &GrantShareLookup) -> String {
    let mut out = String::new();

    heading(&mut out, &format!("Grant {}: {}", share.grant_id, share.title));
    let _ = writeln!(out, "Recipient:   {}", share.recipient);
    let _ = writeln!(out, "Fiscal year: {}", share.fiscal_year);
    let _ = writeln!(out, "Value:       {}", share.total_value.formatted);
    let _ = writeln!(
        out,
        "Your share:  {} ({}/mo), {} of your income",
        share.user_share.formatted,
        share.monthly_share.formatted,
        format_percentage(share.percentage_of_income, 6)
    );
    if share.is_notable {
        let _ = writeln!(out, "Notable:     {}", share.notable_reason);
    }
    if !share.description.is_empty() {
        let _ = writeln!(out, "\n{}", share.description);
    }

    out
}

pub fn render_stats(stats: &StatsReport) -> String {
    let mut out = String::new();
    let domestic = &stats.domestic;

    heading(&mut out, "Domestic grants");
    let _ = writeln!(out, "Grants:    {}", domestic.total_grants);
    let _ = writeln!(out, "Total:     {}", format_currency(domestic.total_value));
    let _ = writeln!(out, "Average:   {}", format_currency(domestic.average_value));
    let _ = writeln!(out, "Median:    {}", format_currency(domestic.median_value));
    let _ = writeln!(
        out,
        "Provinces: {}, major: {}, notable: {}",
        domestic.province_count, domestic.major_count, domestic.notable_count
    );

    heading(&mut out, "By value");
    for band in &stats.value_distribution {
        let _ = writeln!(
            out,
            "{:<16}{:>8}{:>8}",
            band.label,
            band.count,
            format_percentage(band.percentage, 1)
        );
    }

    for (title, groups) in [
        ("By fiscal year", &stats.by_fiscal_year),
        ("By province", &stats.by_province),
        ("Top recipients", &stats.top_recipients),
        ("Top programs", &stats.top_programs),
        ("Top sectors", &stats.top_sectors),
        ("By recipient type", &stats.by_recipient_type),
    ] {
        heading(&mut out, title);
        for group in groups {
            let key = if group.key.is_empty() { "(unspecified)" } else { &group.key };
            let _ = writeln!(
                out,
                "{:>8}{:>22}  {key}",
                group.count,
                format_currency(group.total_value)
            );
        }
    }

    let gac = &stats.gac;
    heading(&mut out, "GAC projects");
    let _ = writeln!(out, "Projects:  {}", gac.total_grants);
    let _ = writeln!(out, "Total:     {}", format_currency(gac.total_value));
    let _ = writeln!(
        out,
        "Major:     {} ({})",
        gac.major_count,
        format_currency(gac.major_value)
    );
    for status in &gac.by_status {
        let _ = writeln!(
            out,
            "{:<12}{:>8}{:>22}",
            status.status.label(),
            status.count,
            format_currency(status.total_value)
        );
    }
    let _ = writeln!(
        out,
        "Markers: gender {}, environment {}, governance {}",
        gac.gender_marker_count, gac.environment_marker_count, gac.governance_marker_count
    );

    out
}

fn grant_line(grant: &Grant) -> String {
    let flag = if grant.is_notable { "*" } else { " " };
    format!(
        "{flag}{:>6}  {:>16}  {}  {:<3} {} - {}",
        grant.id,
        format_currency(grant.agreement_value),
        grant.fiscal_year,
        grant.recipient_province,
        grant.agreement_title,
        grant.recipient_legal_name
    )
}

fn gac_line(grant: &GlobalAffairsGrant) -> String {
    format!(
        "{:>7}  {:>16}  {:<11} {} - {}",
        grant.project_number,
        format_currency(grant.maximum_contribution),
        grant.status.label(),
        grant.title,
        grant.primary_country()
    )
}

pub fn render_search(results: &SearchResults) -> String {
    let mut out = String::new();

    let lines: Vec<String> = match results {
        SearchResults::Domestic(grants) => grants.iter().map(grant_line).collect(),
        SearchResults::Gac(grants) => grants.iter().map(gac_line).collect(),
    };
    for line in &lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "{} match(es)", results.len());

    out
}
