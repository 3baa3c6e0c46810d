mod aggregation;
mod proxy;
