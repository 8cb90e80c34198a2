pub mod sheet_grid;
