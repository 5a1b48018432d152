pub mod city;
pub mod names;
pub mod registry;
pub mod table;
pub mod template;
pub mod toolkit;
pub mod weighted;
