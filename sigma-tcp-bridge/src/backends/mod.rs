pub mod bioson;
pub mod i2c;
pub mod regmap;
