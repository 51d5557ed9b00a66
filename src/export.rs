use crate::{error::InventoryError, models::InventoryItem};

/// A column of the inventory table as shown on the Overview page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    ItemId,
    ItemName,
    Category,
    Quantity,
    Uom,
    Price,
    Currency,
    ReorderLevel,
    ReorderTriggered,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::ItemId,
        Column::ItemName,
        Column::Category,
        Column::Quantity,
        Column::Uom,
        Column::Price,
        Column::Currency,
        Column::ReorderLevel,
        Column::ReorderTriggered,
    ];

    /// Stable key used in query strings (`columns=item_id,price`).
    pub fn key(self) -> &'static str {
        match self {
            Column::ItemId => "item_id",
            Column::ItemName => "item_name",
            Column::Category => "category",
            Column::Quantity => "quantity",
            Column::Uom => "uom",
            Column::Price => "price",
            Column::Currency => "currency",
            Column::ReorderLevel => "reorder_level",
            Column::ReorderTriggered => "reorder_triggered",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::ItemId => "Item ID",
            Column::ItemName => "Item Name",
            Column::Category => "Category",
            Column::Quantity => "Quantity",
            Column::Uom => "UOM",
            Column::Price => "Price per Unit",
            Column::Currency => "Currency",
            Column::ReorderLevel => "Reorder Level",
            Column::ReorderTriggered => "Reorder Triggered",
        }
    }

    pub fn from_key(key: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Parses a comma-separated column selection. Empty means every column
    /// in table order.
    pub fn parse_list(raw: &str) -> Result<Vec<Column>, InventoryError> {
        let mut columns = Vec::new();
        for key in raw.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            let column = Column::from_key(key)
                .ok_or_else(|| InventoryError::validation(format!("Unknown column '{}'", key)))?;
            if !columns.contains(&column) {
                columns.push(column);
            }
        }

        if columns.is_empty() {
            Ok(Column::ALL.to_vec())
        } else {
            Ok(columns)
        }
    }

    /// Raw value of this column, with numbers in their plain `Display` form.
    pub fn value(self, item: &InventoryItem) -> String {
        match self {
            Column::ItemId => item.item_id.clone(),
            Column::ItemName => item.item_name.clone(),
            Column::Category => item.category.clone(),
            Column::Quantity => number(item.quantity),
            Column::Uom => item.uom.clone(),
            Column::Price => number(item.price),
            Column::Currency => item.currency.clone(),
            Column::ReorderLevel => number(item.reorder_level),
            Column::ReorderTriggered => item.reorder_triggered.to_string(),
        }
    }
}

fn number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

/// Serializes the displayed view (rows and columns, in display order) as CSV
/// with a header row.
pub fn to_delimited<'a, I>(items: I, columns: &[Column]) -> Result<String, InventoryError>
where
    I: IntoIterator<Item = &'a InventoryItem>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.header()))?;
    for item in items {
        writer.write_record(columns.iter().map(|c| c.value(item)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| InventoryError::Export(csv::Error::from(err.into_error())))?;

    String::from_utf8(bytes).map_err(|err| {
        InventoryError::Export(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err,
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> InventoryItem {
        InventoryItem {
            item_id: "A1".into(),
            item_name: "Widget".into(),
            category: "Hardware".into(),
            quantity: 1200.0,
            uom: "pcs".into(),
            price: 2.5,
            currency: "USD".into(),
            reorder_level: 70.0,
            reorder_triggered: false,
        }
    }

    #[test]
    fn all_columns_in_table_order() {
        let items = vec![widget()];
        let csv = to_delimited(&items, &Column::ALL).unwrap();

        assert_eq!(
            csv,
            "Item ID,Item Name,Category,Quantity,UOM,Price per Unit,Currency,Reorder Level,Reorder Triggered\n\
             A1,Widget,Hardware,1200,pcs,2.5,USD,70,false\n"
        );
    }

    #[test]
    fn selected_columns_keep_display_order() {
        let items = vec![widget()];
        let columns = Column::parse_list("price, item_name").unwrap();
        let csv = to_delimited(&items, &columns).unwrap();

        assert_eq!(csv, "Price per Unit,Item Name\n2.5,Widget\n");
    }

    #[test]
    fn fields_with_commas_and_quotes_are_quoted() {
        let mut item = widget();
        item.item_name = "Bolt, \"M8\"".into();
        let items = vec![item];
        let csv = to_delimited(&items, &[Column::ItemId, Column::ItemName]).unwrap();

        assert_eq!(csv, "Item ID,Item Name\nA1,\"Bolt, \"\"M8\"\"\"\n");
    }

    #[test]
    fn empty_view_still_has_a_header() {
        let csv = to_delimited(&Vec::<InventoryItem>::new(), &[Column::ItemId]).unwrap();
        assert_eq!(csv, "Item ID\n");
    }

    #[test]
    fn column_list_parsing() {
        assert_eq!(Column::parse_list("").unwrap(), Column::ALL.to_vec());
        assert_eq!(
            Column::parse_list("uom,uom,item_id").unwrap(),
            vec![Column::Uom, Column::ItemId]
        );
        assert!(matches!(
            Column::parse_list("item_id,colour"),
            Err(InventoryError::Validation(_))
        ));
    }
}
