table! {
    api_keys (id) {
        id -> Uuid,
        user_id -> Uuid,
        name -> Text,
        prefix -> Text,
        key_hash -> Text,
        revoked -> Bool,
        expires_at -> Nullable<Timestamp>,
        last_used_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

table! {
    article_categories (article_id, category_id) {
        article_id -> Uuid,
        category_id -> Uuid,
    }
}

table! {
    article_views (article_id, client_identifier) {
        article_id -> Uuid,
        client_identifier -> Text,
        created_at -> Timestamp,
    }
}

table! {
    articles (id) {
        id -> Uuid,
        slug -> Text,
        title -> Text,
        content -> Text,
        channel_id -> Uuid,
        author_id -> Uuid,
        location_name -> Nullable<Text>,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        status -> Text,
        view_count -> Int8,
        created_at -> Timestamp,
        edited_at -> Nullable<Timestamp>,
    }
}

table! {
    categories (id) {
        id -> Uuid,
        name -> Text,
        slug -> Text,
    }
}

table! {
    channels (id) {
        id -> Uuid,
        owner_id -> Uuid,
        name -> Text,
        slug -> Text,
        description -> Text,
        profile_image_url -> Nullable<Text>,
        banner_image_url -> Nullable<Text>,
        admin_subscriber_count -> Int8,
        created_at -> Timestamp,
    }
}

table! {
    comments (id) {
        id -> Uuid,
        article_id -> Uuid,
        author_id -> Uuid,
        body -> Text,
        created_at -> Timestamp,
        edited_at -> Nullable<Timestamp>,
    }
}

table! {
    reactions (article_id, user_id) {
        article_id -> Uuid,
        user_id -> Uuid,
        is_like -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    subscriptions (user_id, channel_id) {
        user_id -> Uuid,
        channel_id -> Uuid,
        created_at -> Timestamp,
    }
}

table! {
    tokens (id) {
        id -> Uuid,
        user_id -> Uuid,
        expires -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Uuid,
        username -> Text,
        password -> Text,
        created_at -> Timestamp,
    }
}

joinable!(api_keys -> users (user_id));
joinable!(article_categories -> articles (article_id));
joinable!(article_categories -> categories (category_id));
joinable!(article_views -> articles (article_id));
joinable!(articles -> channels (channel_id));
joinable!(articles -> users (author_id));
joinable!(channels -> users (owner_id));
joinable!(comments -> articles (article_id));
joinable!(comments -> users (author_id));
joinable!(reactions -> articles (article_id));
joinable!(reactions -> users (user_id));
joinable!(subscriptions -> channels (channel_id));
joinable!(subscriptions -> users (user_id));
joinable!(tokens -> users (user_id));

allow_tables_to_appear_in_same_query!(
    api_keys,
    article_categories,
    article_views,
    articles,
    categories,
    channels,
    comments,
    reactions,
    subscriptions,
    tokens,
    users,
);
