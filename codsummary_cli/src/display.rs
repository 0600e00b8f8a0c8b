use codsummary::{classify::Classification, resolve::Resolution};
use comfy_table::{presets::NOTHING, *};

fn mark(matched: bool) -> &'static str {
    if matched {
        "✔"
    } else {
        ""
    }
}

fn classification_table<S: AsRef<str>>(headers: &[S], classification: &Classification) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Header").add_attribute(Attribute::Bold),
            Cell::new("P-code").add_attribute(Attribute::Bold),
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Total population").add_attribute(Attribute::Bold),
        ])
        .set_style(comfy_table::TableComponent::BottomBorder, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, '─')
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::BottomBorderIntersections, '─')
        .set_style(comfy_table::TableComponent::TopBorder, '─')
        .set_style(comfy_table::TableComponent::TopBorderIntersections, '─');
    for header in headers.iter().map(|h| h.as_ref()) {
        table.add_row(vec![
            header,
            mark(classification.pcode_headers.contains(header)),
            mark(classification.name_headers.contains(header)),
            mark(classification.population_headers.contains(header)),
        ]);
    }
    table
}

/// Prints one line per header with the roles it was given, then the chosen total population
/// header.
pub fn display_classification<S: AsRef<str>>(
    headers: &[S],
    classification: &Classification,
    resolution: &Resolution,
) {
    println!("\n{}", classification_table(headers, classification));
    println!("\nTotal population header: {resolution}");
}
