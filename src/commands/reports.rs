use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PosResult;
use crate::models::{WasteItem, WasteKind};
use crate::pos::{today_label, Pos};
use crate::state::PosState;

const UNCATEGORIZED: &str = "Diğer";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub name: String,
    pub category: String,
    pub quantity_sold: u32,
    pub revenue: f64,
}

/// Written-off units of one product.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteGroup {
    pub name: String,
    pub quantity: u32,
    pub total_price: f64,
    pub reasons: Vec<String>,
    pub last_time: String,
    pub last_table_number: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReasonStat {
    pub reason: String,
    pub count: u32,
    pub total: f64,
}

/// End-of-day summary over the current snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub date: String,
    pub total_revenue: f64,
    pub cash_total: f64,
    pub card_total: f64,
    pub cash_percentage: f64,
    pub card_percentage: f64,
    /// Spoilage only; cancelled order lines are reported under `deleted`.
    pub waste_total: f64,
    pub waste_percentage: f64,
    pub product_sales: Vec<ProductSales>,
    pub wasted: Vec<WasteGroup>,
    pub deleted: Vec<WasteGroup>,
    pub waste_reasons: Vec<ReasonStat>,
    pub delete_reasons: Vec<ReasonStat>,
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn category_name(state: &PosState, product_name: &str) -> String {
    state
        .product_by_name(product_name)
        .and_then(|p| state.categories.iter().find(|c| c.id == p.category))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}

fn group_wastes<'a>(wastes: impl Iterator<Item = &'a WasteItem>) -> Vec<WasteGroup> {
    let mut groups: BTreeMap<&str, (WasteGroup, i64)> = BTreeMap::new();
    for waste in wastes {
        let (group, latest) = groups.entry(waste.name.as_str()).or_insert_with(|| {
            (
                WasteGroup {
                    name: waste.name.clone(),
                    quantity: 0,
                    total_price: 0.0,
                    reasons: Vec::new(),
                    last_time: waste.time.clone(),
                    last_table_number: waste.table_number,
                },
                waste.timestamp,
            )
        });
        group.quantity += 1;
        group.total_price += waste.price;
        group.reasons.push(waste.reason.clone());
        if waste.timestamp > *latest {
            *latest = waste.timestamp;
            group.last_time = waste.time.clone();
            group.last_table_number = waste.table_number;
        }
    }

    let mut groups: Vec<WasteGroup> = groups.into_values().map(|(group, _)| group).collect();
    groups.sort_by(|a, b| b.total_price.total_cmp(&a.total_price));
    groups
}

fn group_reasons<'a>(wastes: impl Iterator<Item = &'a WasteItem>) -> Vec<ReasonStat> {
    let mut stats: BTreeMap<&str, ReasonStat> = BTreeMap::new();
    for waste in wastes {
        let stat = stats.entry(waste.reason.as_str()).or_insert_with(|| ReasonStat {
            reason: waste.reason.clone(),
            count: 0,
            total: 0.0,
        });
        stat.count += 1;
        stat.total += waste.price;
    }
    stats.into_values().collect()
}

impl DayReport {
    pub fn build(state: &PosState) -> Self {
        let total_revenue: f64 = state.payments.iter().map(|p| p.total_amount).sum();
        let cash_total: f64 = state.payments.iter().map(|p| p.cash_amount).sum();
        let card_total: f64 = state.payments.iter().map(|p| p.card_amount).sum();

        let of_kind = |kind: WasteKind| state.wastes.iter().filter(move |w| w.kind == kind);
        let waste_total: f64 = of_kind(WasteKind::Waste).map(|w| w.price).sum();

        // Every unit still on an order counts, paid or not
        let mut sales: BTreeMap<&str, ProductSales> = BTreeMap::new();
        for item in state.orders.iter().flat_map(|o| o.order_items.iter()) {
            let line = sales.entry(item.name.as_str()).or_insert_with(|| ProductSales {
                name: item.name.clone(),
                category: category_name(state, &item.name),
                quantity_sold: 0,
                revenue: 0.0,
            });
            line.quantity_sold += 1;
            line.revenue += item.price;
        }
        let mut product_sales: Vec<ProductSales> = sales.into_values().collect();
        product_sales.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));

        DayReport {
            date: today_label(),
            total_revenue,
            cash_total,
            card_total,
            cash_percentage: percentage(cash_total, total_revenue),
            card_percentage: percentage(card_total, total_revenue),
            waste_total,
            waste_percentage: percentage(waste_total, total_revenue),
            product_sales,
            wasted: group_wastes(of_kind(WasteKind::Waste)),
            deleted: group_wastes(of_kind(WasteKind::Delete)),
            waste_reasons: group_reasons(of_kind(WasteKind::Waste)),
            delete_reasons: group_reasons(of_kind(WasteKind::Delete)),
        }
    }

    pub fn units_sold(&self) -> u32 {
        self.product_sales.iter().map(|p| p.quantity_sold).sum()
    }
}

/// Output format for the end-of-day report. Reports are write-only.
pub trait ReportExporter {
    fn extension(&self) -> &'static str;
    fn write(&self, report: &DayReport, out: &mut dyn Write) -> PosResult<()>;
}

pub struct JsonReportExporter;

impl ReportExporter for JsonReportExporter {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn write(&self, report: &DayReport, out: &mut dyn Write) -> PosResult<()> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// Spreadsheet-friendly export: a summary block followed by the sales and
/// write-off tables, separated by blank lines.
pub struct CsvReportExporter;

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(out: &mut dyn Write, fields: &[String]) -> PosResult<()> {
    let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    writeln!(out, "{}", line.join(","))?;
    Ok(())
}

impl ReportExporter for CsvReportExporter {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn write(&self, report: &DayReport, out: &mut dyn Write) -> PosResult<()> {
        let money = |v: f64| format!("{v:.0}");

        csv_row(out, &["GÜN SONU RAPORU".into(), report.date.clone()])?;
        csv_row(out, &["Toplam Ciro".into(), money(report.total_revenue)])?;
        csv_row(
            out,
            &["Nakit Ödeme".into(), money(report.cash_total), format!("{:.1}%", report.cash_percentage)],
        )?;
        csv_row(
            out,
            &["Kredi Kartı".into(), money(report.card_total), format!("{:.1}%", report.card_percentage)],
        )?;
        csv_row(
            out,
            &["Zayi/Fire".into(), money(report.waste_total), format!("{:.2}%", report.waste_percentage)],
        )?;

        writeln!(out)?;
        csv_row(
            out,
            &["Sıra".into(), "Ürün Adı".into(), "Kategori".into(), "Satılan Adet".into(), "Toplam Tutar (TL)".into()],
        )?;
        for (idx, product) in report.product_sales.iter().enumerate() {
            csv_row(
                out,
                &[
                    (idx + 1).to_string(),
                    product.name.clone(),
                    product.category.clone(),
                    product.quantity_sold.to_string(),
                    money(product.revenue),
                ],
            )?;
        }
        csv_row(
            out,
            &[String::new(), "TOPLAM".into(), String::new(), report.units_sold().to_string(), money(report.total_revenue)],
        )?;

        for (title, groups) in [("ZAYİ/FİRE", &report.wasted), ("AKTİF İPTAL", &report.deleted)] {
            if groups.is_empty() {
                continue;
            }
            writeln!(out)?;
            csv_row(out, &[title.into(), "Adet".into(), "Tutar (TL)".into(), "Sebepler".into()])?;
            for group in groups {
                csv_row(
                    out,
                    &[
                        group.name.clone(),
                        group.quantity.to_string(),
                        money(group.total_price),
                        group.reasons.join("; "),
                    ],
                )?;
            }
        }
        Ok(())
    }
}

impl Pos {
    pub fn day_report(&self) -> DayReport {
        DayReport::build(self.state())
    }

    /// Writes today's report into `dir` and returns the file path.
    pub fn export_report(&self, exporter: &dyn ReportExporter, dir: &Path) -> PosResult<PathBuf> {
        let report = self.day_report();
        fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "Pub_Rapor_{}.{}",
            report.date.replace('.', "_"),
            exporter.extension()
        ));

        let mut file = fs::File::create(&path)?;
        exporter.write(&report, &mut file)?;
        file.flush()?;

        info!(path = %path.display(), revenue = %report.total_revenue, "Report exported");
        Ok(path)
    }
}
