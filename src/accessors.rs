//! Table specific shortcuts over the generic operations of [Gtfs]
use crate::container::Items;
use crate::{Container, Error, Gtfs, Record};

macro_rules! table_accessors {
    ($table:literal, $add:ident, $remove:ident, $for_each:ident) => {
        #[doc = concat!("Adds records to `", $table, "`, see [Gtfs::add]")]
        pub fn $add<I>(&self, records: I) -> Result<(), Error>
        where
            I: IntoIterator<Item = Record>,
        {
            self.add($table, records)
        }

        #[doc = concat!("Removes records from `", $table, "`, see [Gtfs::remove]")]
        pub fn $remove(&self, records: &[Record]) -> Result<usize, Error> {
            self.remove($table, records)
        }

        #[doc = concat!("Calls `f` on every record of `", $table, "`")]
        pub fn $for_each<F>(&self, f: F) -> Result<(), Error>
        where
            F: FnMut(&Record),
        {
            self.for_each($table, f)
        }
    };
}

macro_rules! get_by_id {
    ($table:literal, $get:ident) => {
        #[doc = concat!("The record of `", $table, "` with the given id")]
        pub fn $get(&self, id: &str) -> Result<Option<Record>, Error> {
            self.get($table, id)
        }
    };
}

macro_rules! parent_of {
    ($child:literal, $parent:literal, $get:ident) => {
        #[doc = concat!("The `", $parent, "` record a `", $child, "` record references")]
        pub fn $get(&self, child: &Record) -> Result<Option<Record>, Error> {
            self.get_parent(child, $parent)
        }
    };
    ($child:literal, $parent:literal, $grandparent:literal, $get:ident) => {
        #[doc = concat!("The `", $grandparent, "` record of the `", $parent, "` record a `", $child, "` record references")]
        pub fn $get(&self, child: &Record) -> Result<Option<Record>, Error> {
            self.get_grandparent(child, $parent, $grandparent)
        }
    };
}

macro_rules! children_of {
    ($parent:literal, $child:literal, $get:ident) => {
        #[doc = concat!("The `", $child, "` records of a `", $parent, "` record, keyed by their second index key")]
        pub fn $get(&self, parent: &Record) -> Result<Option<Items>, Error> {
            self.get_children_of_parent(parent, $child)
        }
    };
}

impl Gtfs {
    table_accessors!("agency", add_agencies, remove_agencies, for_each_agency);
    table_accessors!("calendar", add_calendars, remove_calendars, for_each_calendar);
    table_accessors!(
        "calendar_dates",
        add_calendar_dates,
        remove_calendar_dates,
        for_each_calendar_date
    );
    table_accessors!(
        "fare_attributes",
        add_fare_attributes,
        remove_fare_attributes,
        for_each_fare_attribute
    );
    table_accessors!("fare_rules", add_fare_rules, remove_fare_rules, for_each_fare_rule);
    table_accessors!("frequencies", add_frequencies, remove_frequencies, for_each_frequency);
    table_accessors!("routes", add_routes, remove_routes, for_each_route);
    table_accessors!("stop_times", add_stop_times, remove_stop_times, for_each_stop_time);
    table_accessors!("stops", add_stops, remove_stops, for_each_stop);
    table_accessors!("trips", add_trips, remove_trips, for_each_trip);
    table_accessors!("shapes", add_shape_points, remove_shape_points, for_each_shape_point);
    table_accessors!("transfers", add_transfers, remove_transfers, for_each_transfer);
    table_accessors!("pathways", add_pathways, remove_pathways, for_each_pathway);

    get_by_id!("agency", get_agency);
    get_by_id!("calendar", get_calendar);
    get_by_id!("fare_attributes", get_fare_attribute);
    get_by_id!("routes", get_route);
    get_by_id!("stops", get_stop);
    get_by_id!("trips", get_trip);
    get_by_id!("pathways", get_pathway);

    parent_of!("routes", "agency", get_agency_of_route);
    parent_of!("trips", "routes", get_route_of_trip);
    parent_of!("trips", "calendar", get_calendar_of_trip);
    parent_of!("stop_times", "trips", get_trip_of_stop_time);
    parent_of!("stop_times", "stops", get_stop_of_stop_time);
    parent_of!("stop_times", "trips", "routes", get_route_of_stop_time);
    parent_of!("stop_times", "trips", "calendar", get_calendar_of_stop_time);

    children_of!("trips", "stop_times", stop_times_of_trip);
    children_of!("trips", "frequencies", frequencies_of_trip);
    children_of!("trips", "shapes", shape_points_of_trip);
    children_of!("calendar", "calendar_dates", calendar_dates_of_calendar);

    /// The stop time of a trip at a given sequence
    pub fn get_stop_time(&self, trip_id: &str, stop_sequence: &str) -> Result<Option<Record>, Error> {
        self.get_by_keys("stop_times", trip_id, stop_sequence)
    }

    pub fn get_transfer(&self, from_stop_id: &str, to_stop_id: &str) -> Result<Option<Record>, Error> {
        self.get_by_keys("transfers", from_stop_id, to_stop_id)
    }

    /// The stops where a trip calls, in the order of its stop times
    pub fn stops_of_trip(&self, trip: &Record) -> Result<Vec<Record>, Error> {
        let mut stops = Vec::new();
        if let Some(stop_times) = self.stop_times_of_trip(trip)? {
            for stop_time in stop_times.values() {
                if let Some(stop) = self.get_stop_of_stop_time(stop_time)? {
                    stops.push(stop);
                }
            }
        }
        Ok(stops)
    }

    pub fn get_feed_info(&self) -> Result<Option<Record>, Error> {
        self.get_singleton("feed_info")
    }

    /// Replaces the feed information, `None` removes it
    pub fn set_feed_info(&self, feed_info: Option<Record>) -> Result<(), Error> {
        self.set("feed_info", Container::Singleton(feed_info))
    }
}
