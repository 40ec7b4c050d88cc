//! Mapping of collection settings onto driver options.

use mongodb::options::{
    Acknowledgment as MongoAcknowledgment, CollectionOptions, ReadConcern as MongoReadConcern,
    ReadPreference as MongoReadPreference, SelectionCriteria, WriteConcern as MongoWriteConcern,
};

use docview_core::settings::{
    Acknowledgment, CollectionSettings, ReadConcern, ReadPreference, WriteConcern,
};

pub(crate) fn collection_options(settings: &CollectionSettings) -> CollectionOptions {
    let mut options = CollectionOptions::default();

    options.read_concern = settings.read_concern.map(read_concern);
    options.selection_criteria = settings
        .read_preference
        .map(|preference| SelectionCriteria::ReadPreference(read_preference(preference)));
    options.write_concern = settings.write_concern.as_ref().map(write_concern);

    options
}

fn read_concern(concern: ReadConcern) -> MongoReadConcern {
    match concern {
        ReadConcern::Local => MongoReadConcern::local(),
        ReadConcern::Available => MongoReadConcern::available(),
        ReadConcern::Majority => MongoReadConcern::majority(),
        ReadConcern::Linearizable => MongoReadConcern::linearizable(),
        ReadConcern::Snapshot => MongoReadConcern::snapshot(),
    }
}

fn read_preference(preference: ReadPreference) -> MongoReadPreference {
    match preference {
        ReadPreference::Primary => MongoReadPreference::Primary,
        ReadPreference::PrimaryPreferred => MongoReadPreference::PrimaryPreferred {
            options: Default::default(),
        },
        ReadPreference::Secondary => MongoReadPreference::Secondary {
            options: Default::default(),
        },
        ReadPreference::SecondaryPreferred => MongoReadPreference::SecondaryPreferred {
            options: Default::default(),
        },
        ReadPreference::Nearest => MongoReadPreference::Nearest {
            options: Default::default(),
        },
    }
}

fn write_concern(concern: &WriteConcern) -> MongoWriteConcern {
    let mut mapped = MongoWriteConcern::default();

    mapped.w = concern.w.as_ref().map(|w| match w {
        Acknowledgment::Nodes(count) => MongoAcknowledgment::Nodes(*count),
        Acknowledgment::Majority => MongoAcknowledgment::Majority,
        Acknowledgment::Tag(tag) => MongoAcknowledgment::Custom(tag.clone()),
    });
    mapped.journal = concern.journal;
    mapped.w_timeout = concern.timeout();

    mapped
}
