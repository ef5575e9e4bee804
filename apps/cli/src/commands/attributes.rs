//! 属性表命令
//!
//! 打印对外暴露的全部属性（名称、单位、访问方式、取值范围），不连接控制器。

use pistage_client::{AttributeDescriptor, attribute_table};
use pistage_driver::TravelRange;

/// 打印属性表
pub fn print_attributes(range: &TravelRange) {
    println!("{}", render_table(&attribute_table(range)));
}

/// 渲染为定宽文本表格
pub fn render_table(table: &[AttributeDescriptor]) -> String {
    let mut out = format!(
        "{:<24} {:<6} {:<6} {:>14} {:>14}",
        "NAME", "UNIT", "ACCESS", "MIN", "MAX"
    );
    for descriptor in table {
        out.push('\n');
        out.push_str(&format!(
            "{:<24} {:<6} {:<6} {:>14} {:>14}",
            descriptor.name,
            descriptor.unit,
            descriptor.access.to_string(),
            format_bound(descriptor.min),
            format_bound(descriptor.max),
        ));
    }
    out
}

fn format_bound(bound: Option<f64>) -> String {
    bound.map(|value| format!("{value:.3}")).unwrap_or_else(|| "-".to_string())
}
