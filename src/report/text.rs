//! Plain-text companions of the report: the daily analysis and the ingestion
//! quality report.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

use crate::config::ReportConfig;
use crate::parser::Period;
use crate::report::types::{PeriodSnapshot, ReportSummary, TopStreet};
use crate::stats::IngestStats;

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

/// Joins street names as `"A; B; C e D"`.
pub fn format_top_streets(top: &[TopStreet]) -> String {
    match top {
        [] => "Nenhum logradouro encontrado.".to_string(),
        [only] => only.street.clone(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(|t| t.street.as_str()).collect();
            format!("{} e {}", head.join("; "), last.street)
        }
    }
}

/// The analysis paragraph for the last day of the report.
pub fn analysis_paragraph(summary: &ReportSummary, config: &ReportConfig) -> String {
    let [madr, manha, tarde, noite] = snapshots(summary);
    let variation = match summary.percent_change {
        v if v > 0.0 => "um aumento",
        v if v < 0.0 => "uma diminuição",
        _ => "estabilidade",
    };

    format!(
        "Na região de {region}, em {day} foram localizadas {m} pessoas de madrugada (05h), \
         {mh} de manhã (10h), {t} à tarde (15h) e {n} à noite (20h) do dia {night_day}. \
         Os {top_n} logradouros com maior frequência nos últimos {top_days} dias são: {top}. \
         Com mais de {threshold} pessoas, foram {me} endereços de madrugada, {mhe} de manhã, \
         {te} à tarde e {ne} à noite, somando respectivamente {ms}, {mhs}, {ts} e {ns}. \
         A média atual é de {avg} pessoas por dia, {variation} de {pct:.1}% \
         em relação à contagem enviada {reference}.",
        region = config.region_label,
        day = br_date(madr.day),
        m = whole(madr.total),
        mh = whole(manha.total),
        t = whole(tarde.total),
        n = whole(noite.total),
        night_day = noite.day.format("%d"),
        top_n = config.top_n,
        top_days = config.top_streets_days,
        top = format_top_streets(&summary.top_streets),
        threshold = whole(config.threshold),
        me = madr.crowded_sites,
        mhe = manha.crowded_sites,
        te = tarde.crowded_sites,
        ne = noite.crowded_sites,
        ms = whole(madr.crowded_total),
        mhs = whole(manha.crowded_total),
        ts = whole(tarde.crowded_total),
        ns = whole(noite.crowded_total),
        avg = whole(summary.current_average),
        pct = summary.percent_change.abs(),
        reference = summary.comparison_reference,
    )
}

/// Full analysis text: header, paragraph, averages and last-day blocks.
pub fn render_analysis(
    summary: &ReportSummary,
    config: &ReportConfig,
    generated_at: NaiveDateTime,
) -> String {
    let current = &summary.current_window;
    let previous = &summary.previous_window;
    let threshold = whole(config.threshold);
    let last_day = snapshots(summary)[0].day;

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nTEXTO DE ANÁLISE - RELATÓRIO DIÁRIO\n{RULE}\n");
    let _ = writeln!(
        out,
        "Período do Relatório: {} a {}",
        br_date(current.start),
        br_date(current.end)
    );
    let _ = writeln!(
        out,
        "Gerado em: {}\n",
        generated_at.format("%d/%m/%Y às %H:%M:%S")
    );

    let _ = writeln!(out, "{RULE}\nANÁLISE\n{RULE}\n");
    let _ = writeln!(out, "{}\n", analysis_paragraph(summary, config));

    let _ = writeln!(out, "{RULE}\nESTATÍSTICAS\n{RULE}\n");
    let _ = writeln!(
        out,
        "Média Atual:    {} pessoas/dia (intervalo {} a {})",
        whole(summary.current_average),
        br_date(current.start),
        br_date(current.end)
    );
    let _ = writeln!(
        out,
        "Média Anterior: {} pessoas/dia (intervalo {} a {})",
        whole(summary.previous_average),
        br_date(previous.start),
        br_date(previous.end)
    );
    let _ = writeln!(out, "Variação:       {:+.1}%\n", summary.percent_change);

    let _ = writeln!(
        out,
        "{RULE}\nÚLTIMO DIA ANALISADO - {}\n{RULE}\n",
        br_date(last_day)
    );
    for snapshot in &summary.last_day {
        let heading = match snapshot.period {
            Period::Noite => format!(
                "{} ({}) do dia {}",
                snapshot.period,
                snapshot.period.hour(),
                br_date(snapshot.day)
            ),
            p => format!("{} ({})", p, p.hour()),
        };
        let _ = writeln!(out, "{heading}:");
        let _ = writeln!(out, "  • Total de pessoas: {}", whole(snapshot.total));
        let _ = writeln!(
            out,
            "  • Endereços com >{threshold} pessoas: {}",
            snapshot.crowded_sites
        );
        let _ = writeln!(
            out,
            "  • Soma nas aglomerações: {}\n",
            whole(snapshot.crowded_total)
        );
    }

    if !summary.deltas.is_empty() {
        let _ = writeln!(out, "{RULE}\nVARIAÇÕES ENTRE DIAS\n{RULE}\n");
        for delta in &summary.deltas {
            let _ = writeln!(
                out,
                "  • {} ({}, {} → {}): {:+} pessoas ({:+.1}%)",
                delta.street,
                delta.period,
                delta.from_day.format("%d/%m"),
                delta.to_day.format("%d/%m"),
                whole(delta.delta),
                delta.percent
            );
        }
        out.push('\n');
    }

    out.push_str(RULE);
    out.push('\n');
    out
}

/// Parsing-quality report written next to a processed table.
pub fn render_quality_report(
    stats: &IngestStats,
    input_name: &str,
    output_name: &str,
    generated_at: NaiveDateTime,
) -> String {
    let total = stats.total_rows;
    let pct = |part: usize| IngestStats::pct(part, total);

    let mut out = String::new();
    let _ = writeln!(out, "{RULE}\nRELATÓRIO DE PROCESSAMENTO - PARSER COMPLETO\n{RULE}\n");
    let _ = writeln!(out, "Data/Hora: {}", generated_at.format("%d/%m/%Y %H:%M:%S"));
    let _ = writeln!(out, "Arquivo de entrada: {input_name}");
    let _ = writeln!(out, "Arquivo de saída: {output_name}");
    let _ = writeln!(out, "Registros processados: {}", thousands(total));
    let _ = writeln!(
        out,
        "Registros descartados: {} (data inválida: {}, quantidade inválida: {})\n",
        thousands(stats.dropped_rows()),
        stats.dropped_bad_date,
        stats.dropped_bad_count
    );

    if stats.with_street > 0 {
        let _ = writeln!(out, "{THIN_RULE}\nLOGRADOURO");
        for (label, count) in [
            ("Com tipo", stats.with_type),
            ("Com nome", stats.with_name),
            ("Com número", stats.with_number),
            ("Com complemento", stats.with_complement),
        ] {
            let _ = writeln!(out, "{label}: {} ({:.1}%)", thousands(count), pct(count));
        }
        let _ = writeln!(out, "\nTop 10 tipos:");
        for (i, (kind, count)) in stats.top_street_types(10).into_iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:2}. {:<15} {:>8} ({:>5.1}%)",
                i + 1,
                kind,
                thousands(count),
                pct(count)
            );
        }
        out.push('\n');
    }

    if stats.with_period > 0 {
        let _ = writeln!(out, "{THIN_RULE}\nPERÍODO");
        let _ = writeln!(
            out,
            "Padronizados: {} ({:.1}%)",
            thousands(stats.with_period),
            pct(stats.with_period)
        );
        let _ = writeln!(out, "Valores únicos: {}\n", stats.periods.len());
        let _ = writeln!(out, "Distribuição:");
        for (period, count) in &stats.periods {
            let _ = writeln!(
                out,
                "  • {:<20} {:>8} ({:>5.1}%)",
                period,
                thousands(*count),
                pct(*count)
            );
        }
        out.push('\n');
    }

    out
}

fn snapshots(summary: &ReportSummary) -> [PeriodSnapshot; 4] {
    Period::ALL.map(|period| {
        summary.snapshot(period).cloned().unwrap_or(PeriodSnapshot {
            period,
            day: summary.current_window.end,
            total: 0.0,
            crowded_sites: 0,
            crowded_total: 0.0,
        })
    })
}

fn br_date(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}

/// Drops the fractional part.
fn whole(value: f64) -> i64 {
    value.trunc() as i64
}

/// `1234567` → `"1,234,567"`.
fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
