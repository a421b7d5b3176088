use anyhow::Result;
use archive_core::helpers::dto::{
    Course, CourseSummary, NewCourse, UserRecord, VideoDetails, VideoRecord, VideoSessionSummary,
};
use archive_core::pagination::{Page, Pivot};
use archive_core::upload::{UserId, VideoSubmission};
use serde::{Serialize, de::DeserializeOwned};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionResult,
};
use sled::{Db, Transactional, Tree};

const COURSES_TREE: &str = "courses";
const USERS_TREE: &str = "users";
const VIDEOS_TREE: &str = "videos";
const VERIFIED_VIDEOS_TREE: &str = "verified_videos";

/// Number of entries shown by `/review`.
pub const REVIEW_LIST_LIMIT: usize = 20;

/// Courses, users and videos of the archive.
///
/// Keys are big-endian so sled's byte order matches numeric order. The
/// `verified_videos` tree is an index of `course_id ‖ session_number ‖ video_id`
/// holding only verified videos, which is what the session browser pages over.
#[derive(Clone)]
pub struct ArchiveStorage {
    db: Db,
    courses: Tree,
    users: Tree,
    videos: Tree,
    verified: Tree,
}

impl ArchiveStorage {
    pub fn new(db: &Db) -> sled::Result<Self> {
        Ok(Self {
            db: db.clone(),
            courses: db.open_tree(COURSES_TREE)?,
            users: db.open_tree(USERS_TREE)?,
            videos: db.open_tree(VIDEOS_TREE)?,
            verified: db.open_tree(VERIFIED_VIDEOS_TREE)?,
        })
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        // generate_id starts at 0; ids start at 1 so 0 can serve as "from the start".
        Ok(self.db.generate_id()? + 1)
    }

    pub fn add_course(&self, course: NewCourse) -> Result<Course> {
        let course = Course {
            id: self.next_id()?,
            name: course.name,
            lecturer: course.lecturer,
            group_id: course.group_id,
            code: course.code,
        };
        self.courses
            .insert(course.id.to_be_bytes(), encode(&course)?)?;
        Ok(course)
    }

    pub fn get_course(&self, id: u64) -> Result<Option<Course>> {
        self.courses
            .get(id.to_be_bytes())?
            .map(|ivec| decode(&ivec))
            .transpose()
    }

    /// Page over courses by id.
    ///
    /// `Up` returns ids >= `id` and `Down` ids <= `id`; both come back ascending.
    pub fn courses_page(&self, pivot: Pivot, id: u64, limit: usize) -> Result<Page<CourseSummary>> {
        let key = id.to_be_bytes();
        let mut courses = match pivot {
            Pivot::Up => self
                .courses
                .range(key..)
                .take(limit)
                .map(|kv| decode::<Course>(&kv?.1))
                .collect::<Result<Vec<_>>>()?,
            Pivot::Down => self
                .courses
                .range(..=key)
                .rev()
                .take(limit)
                .map(|kv| decode::<Course>(&kv?.1))
                .collect::<Result<Vec<_>>>()?,
        };
        if pivot == Pivot::Down {
            courses.reverse();
        }

        let (Some(first), Some(last)) = (courses.first(), courses.last()) else {
            return Ok(Page::empty());
        };
        let has_before = self.courses.get_lt(first.id.to_be_bytes())?.is_some();
        let has_next = self.courses.get_gt(last.id.to_be_bytes())?.is_some();

        Ok(Page {
            items: courses.iter().map(CourseSummary::from).collect(),
            has_before,
            has_next,
        })
    }

    /// Insert or refresh a user, keeping any admin flag already stored.
    pub fn register_user(&self, user_id: UserId, username: Option<String>, name: String) -> Result<()> {
        let is_admin = self.get_user(user_id)?.map(|u| u.is_admin).unwrap_or(false);
        let record = UserRecord {
            user_id,
            username,
            name,
            is_admin,
        };
        self.users.insert(user_id.to_be_bytes(), encode(&record)?)?;
        Ok(())
    }

    pub fn get_user(&self, user_id: UserId) -> Result<Option<UserRecord>> {
        self.users
            .get(user_id.to_be_bytes())?
            .map(|ivec| decode(&ivec))
            .transpose()
    }

    pub fn set_admin(&self, user_id: UserId, is_admin: bool) -> Result<()> {
        let record = match self.get_user(user_id)? {
            Some(mut record) => {
                record.is_admin = is_admin;
                record
            }
            // Placeholder until the user talks to the bot and registers properly.
            None => UserRecord {
                user_id,
                username: None,
                name: user_id.to_string(),
                is_admin,
            },
        };
        self.users.insert(user_id.to_be_bytes(), encode(&record)?)?;
        Ok(())
    }

    pub fn is_admin(&self, user_id: UserId) -> Result<bool> {
        Ok(self.get_user(user_id)?.map(|u| u.is_admin).unwrap_or(false))
    }

    /// Store a finished upload. Videos from admins are verified right away.
    ///
    /// Returns the new video id and whether it was auto-verified.
    pub fn add_video(&self, submission: &VideoSubmission) -> Result<(u64, bool)> {
        let verified = self.is_admin(submission.uploader)?;
        let record = VideoRecord {
            id: self.next_id()?,
            course_id: submission.course_id,
            video_file_id: submission.video_file_id.clone(),
            session_number: submission.session_number,
            uploader: submission.uploader,
            topic: submission.topic.clone(),
            session_date: submission.session_date,
            added_at: submission.added_at,
            verified,
        };

        self.videos.insert(record.id.to_be_bytes(), encode(&record)?)?;
        if verified {
            self.index_verified(&record)?;
        }
        Ok((record.id, verified))
    }

    pub fn get_video(&self, id: u64) -> Result<Option<VideoRecord>> {
        self.videos
            .get(id.to_be_bytes())?
            .map(|ivec| decode(&ivec))
            .transpose()
    }

    /// Mark a video as verified. Returns false if it does not exist.
    ///
    /// Runs as one transaction over `videos` and `verified_videos`, so a
    /// concurrent [`ArchiveStorage::delete_video`] can never be undone by it.
    pub fn verify_video(&self, id: u64) -> Result<bool> {
        let key = id.to_be_bytes();
        let result = (&self.videos, &self.verified).transaction(|(videos, verified)| {
            let Some(ivec) = videos.get(&key[..])? else {
                return Ok(false);
            };
            let mut record: VideoRecord = decode_in_transaction(&ivec)?;
            record.verified = true;
            let bytes = serde_json::to_vec(&record).map_err(ConflictableTransactionError::Abort)?;

            videos.insert(&key[..], bytes)?;
            verified.insert(
                &verified_key(record.course_id, record.session_number, record.id)[..],
                Vec::<u8>::new(),
            )?;
            Ok(true)
        });
        transaction_result(result)
    }

    /// Remove a video and its index entry. Returns false if it does not exist.
    pub fn delete_video(&self, id: u64) -> Result<bool> {
        let key = id.to_be_bytes();
        let result = (&self.videos, &self.verified).transaction(|(videos, verified)| {
            let Some(ivec) = videos.remove(&key[..])? else {
                return Ok(false);
            };
            let record: VideoRecord = decode_in_transaction(&ivec)?;
            verified.remove(&verified_key(record.course_id, record.session_number, record.id)[..])?;
            Ok(true)
        });
        transaction_result(result)
    }

    /// Page over the verified videos of a course by session number.
    pub fn verified_videos_page(
        &self,
        pivot: Pivot,
        course_id: u64,
        session_number: u32,
        limit: usize,
    ) -> Result<Page<VideoSessionSummary>> {
        let course_start = verified_key(course_id, 0, 0);
        let course_end = verified_key(course_id, u32::MAX, u64::MAX);

        let mut videos = match pivot {
            Pivot::Up => self
                .verified
                .range(verified_key(course_id, session_number, 0)..=course_end)
                .take(limit)
                .map(|kv| Ok(summary_from_key(&kv?.0)))
                .collect::<Result<Vec<_>>>()?,
            Pivot::Down => self
                .verified
                .range(course_start..=verified_key(course_id, session_number, u64::MAX))
                .rev()
                .take(limit)
                .map(|kv| Ok(summary_from_key(&kv?.0)))
                .collect::<Result<Vec<_>>>()?,
        };
        if pivot == Pivot::Down {
            videos.reverse();
        }

        let (Some(first), Some(last)) = (videos.first(), videos.last()) else {
            return Ok(Page::empty());
        };
        let has_before = first.session_number > 0
            && self
                .verified
                .range(course_start..verified_key(course_id, first.session_number, 0))
                .next_back()
                .transpose()?
                .is_some();
        let has_next = last.session_number < u32::MAX
            && self
                .verified
                .range(verified_key(course_id, last.session_number + 1, 0)..=course_end)
                .next()
                .transpose()?
                .is_some();

        Ok(Page {
            items: videos,
            has_before,
            has_next,
        })
    }

    /// Suggested session number for the next upload of a course.
    pub fn next_session_number(&self, course_id: u64) -> Result<u32> {
        let last = self
            .verified
            .scan_prefix(course_id.to_be_bytes())
            .next_back()
            .transpose()?;
        Ok(last
            .map(|(key, _)| summary_from_key(&key).session_number.saturating_add(1))
            .unwrap_or(1))
    }

    /// A video joined with its course and uploader.
    ///
    /// Only returns the video when its verified flag equals `verified`, so
    /// unreviewed uploads never leak into the public browser.
    pub fn video_details(&self, id: u64, verified: bool) -> Result<Option<VideoDetails>> {
        match self.get_video(id)? {
            Some(record) if record.verified == verified => self.details_for(record).map(Some),
            _ => Ok(None),
        }
    }

    /// Newest unverified videos first.
    pub fn unverified_videos(&self, limit: usize) -> Result<Vec<VideoDetails>> {
        let mut out = Vec::new();
        for kv in self.videos.iter().rev() {
            let (_, ivec) = kv?;
            let record: VideoRecord = decode(&ivec)?;
            if record.verified {
                continue;
            }
            out.push(self.details_for(record)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }

    /// Export every record, for `/db_dump`.
    pub fn dump(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "courses": decode_tree::<Course>(&self.courses)?,
            "users": decode_tree::<UserRecord>(&self.users)?,
            "videos": decode_tree::<VideoRecord>(&self.videos)?,
        }))
    }

    fn index_verified(&self, record: &VideoRecord) -> Result<()> {
        self.verified.insert(
            verified_key(record.course_id, record.session_number, record.id),
            Vec::<u8>::new(),
        )?;
        Ok(())
    }

    fn details_for(&self, record: VideoRecord) -> Result<VideoDetails> {
        let course_name = self
            .get_course(record.course_id)?
            .map(|c| format!("{} G{}", c.name, c.group_id))
            .unwrap_or_else(|| format!("Course #{}", record.course_id));
        let uploader = self.get_user(record.uploader)?;

        Ok(VideoDetails {
            video_id: record.id,
            video_file_id: record.video_file_id,
            topic: record.topic,
            session_number: record.session_number,
            session_date: record.session_date,
            added_at: record.added_at,
            uploader_name: uploader
                .as_ref()
                .map(|u| u.name.clone())
                .unwrap_or_else(|| record.uploader.to_string()),
            uploader_username: uploader.and_then(|u| u.username),
            course_name,
        })
    }
}

fn verified_key(course_id: u64, session_number: u32, video_id: u64) -> [u8; 20] {
    let mut key = [0u8; 20];
    key[..8].copy_from_slice(&course_id.to_be_bytes());
    key[8..12].copy_from_slice(&session_number.to_be_bytes());
    key[12..].copy_from_slice(&video_id.to_be_bytes());
    key
}

fn summary_from_key(key: &[u8]) -> VideoSessionSummary {
    let mut course_id = [0u8; 8];
    let mut session_number = [0u8; 4];
    let mut video_id = [0u8; 8];
    course_id.copy_from_slice(&key[..8]);
    session_number.copy_from_slice(&key[8..12]);
    video_id.copy_from_slice(&key[12..20]);
    VideoSessionSummary {
        id: u64::from_be_bytes(video_id),
        course_id: u64::from_be_bytes(course_id),
        session_number: u32::from_be_bytes(session_number),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_in_transaction<T: DeserializeOwned>(
    bytes: &[u8],
) -> ConflictableTransactionResult<T, serde_json::Error> {
    serde_json::from_slice(bytes).map_err(ConflictableTransactionError::Abort)
}

fn transaction_result<T>(result: TransactionResult<T, serde_json::Error>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(TransactionError::Abort(e)) => Err(e.into()),
        Err(TransactionError::Storage(e)) => Err(e.into()),
    }
}

fn decode_tree<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<T>> {
    tree.iter().map(|kv| decode(&kv?.1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn storage() -> ArchiveStorage {
        let db = sled::Config::new().temporary(true).open().unwrap();
        ArchiveStorage::new(&db).unwrap()
    }

    fn new_course(name: &str) -> NewCourse {
        NewCourse {
            name: name.to_string(),
            lecturer: "Dr. Smith".to_string(),
            group_id: 1,
            code: 4012,
        }
    }

    fn submission(course_id: u64, uploader: UserId, session_number: u32) -> VideoSubmission {
        VideoSubmission {
            course_id,
            uploader,
            video_file_id: format!("file-{}", session_number),
            session_number,
            session_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            topic: None,
            added_at: Utc::now(),
        }
    }

    fn ids<T>(page: &Page<T>, id: impl Fn(&T) -> u64) -> Vec<u64> {
        page.items.iter().map(id).collect()
    }

    #[test]
    fn test_course_roundtrip() {
        let storage = storage();
        let course = storage.add_course(new_course("Algorithms")).unwrap();
        assert_eq!(storage.get_course(course.id).unwrap(), Some(course));
        assert_eq!(storage.get_course(9_999).unwrap(), None);
    }

    #[test]
    fn test_courses_page_up_and_down() {
        let storage = storage();
        let courses: Vec<Course> = (0..5)
            .map(|i| storage.add_course(new_course(&format!("C{}", i))).unwrap())
            .collect();
        let all: Vec<u64> = courses.iter().map(|c| c.id).collect();

        let first = storage.courses_page(Pivot::Up, 0, 2).unwrap();
        assert_eq!(ids(&first, |c| c.id), all[..2].to_vec());
        assert!(!first.has_before);
        assert!(first.has_next);

        let second = storage.courses_page(Pivot::Up, all[1] + 1, 2).unwrap();
        assert_eq!(ids(&second, |c| c.id), all[2..4].to_vec());
        assert!(second.has_before);
        assert!(second.has_next);

        let back = storage.courses_page(Pivot::Down, all[2] - 1, 2).unwrap();
        assert_eq!(ids(&back, |c| c.id), all[..2].to_vec());
        assert!(!back.has_before);
        assert!(back.has_next);

        let last = storage.courses_page(Pivot::Up, all[4], 2).unwrap();
        assert_eq!(ids(&last, |c| c.id), vec![all[4]]);
        assert!(last.has_before);
        assert!(!last.has_next);
    }

    #[test]
    fn test_empty_courses_page() {
        let storage = storage();
        let page = storage.courses_page(Pivot::Up, 0, 10).unwrap();
        assert!(page.is_empty());
        assert!(!page.has_before);
        assert!(!page.has_next);
    }

    #[test]
    fn test_register_user_keeps_admin_flag() {
        let storage = storage();
        storage.set_admin(5, true).unwrap();
        storage
            .register_user(5, Some("sarak".to_string()), "Sara K".to_string())
            .unwrap();

        let user = storage.get_user(5).unwrap().unwrap();
        assert!(user.is_admin);
        assert_eq!(user.name, "Sara K");
        assert!(!storage.is_admin(6).unwrap());
    }

    #[test]
    fn test_admin_uploads_are_verified() {
        let storage = storage();
        let course = storage.add_course(new_course("Algorithms")).unwrap();
        storage.register_user(1, None, "Student".to_string()).unwrap();
        storage.set_admin(2, true).unwrap();

        let (student_video, student_verified) = storage.add_video(&submission(course.id, 1, 1)).unwrap();
        let (admin_video, admin_verified) = storage.add_video(&submission(course.id, 2, 2)).unwrap();
        assert!(!student_verified);
        assert!(admin_verified);

        assert!(storage.video_details(student_video, true).unwrap().is_none());
        assert!(storage.video_details(student_video, false).unwrap().is_some());
        assert!(storage.video_details(admin_video, true).unwrap().is_some());

        let page = storage.verified_videos_page(Pivot::Up, course.id, 0, 10).unwrap();
        assert_eq!(ids(&page, |v| v.id), vec![admin_video]);
    }

    #[test]
    fn test_review_verify_and_delete() {
        let storage = storage();
        let course = storage.add_course(new_course("Algorithms")).unwrap();
        storage.register_user(1, Some("stud".to_string()), "Student".to_string()).unwrap();

        let (first, _) = storage.add_video(&submission(course.id, 1, 1)).unwrap();
        let (second, _) = storage.add_video(&submission(course.id, 1, 2)).unwrap();

        let pending = storage.unverified_videos(REVIEW_LIST_LIMIT).unwrap();
        assert_eq!(
            pending.iter().map(|v| v.video_id).collect::<Vec<_>>(),
            vec![second, first]
        );
        assert_eq!(pending[0].course_name, "Algorithms G1");
        assert_eq!(pending[0].uploader_username.as_deref(), Some("stud"));

        assert!(storage.verify_video(first).unwrap());
        assert!(storage.delete_video(second).unwrap());
        assert!(!storage.delete_video(second).unwrap());
        assert!(!storage.verify_video(9_999).unwrap());

        assert!(storage.unverified_videos(REVIEW_LIST_LIMIT).unwrap().is_empty());
        assert_eq!(storage.next_session_number(course.id).unwrap(), 2);

        assert!(storage.delete_video(first).unwrap());
        let page = storage.verified_videos_page(Pivot::Up, course.id, 0, 10).unwrap();
        assert!(page.is_empty());
        assert_eq!(storage.next_session_number(course.id).unwrap(), 1);
    }

    #[test]
    fn test_verified_videos_page_is_scoped_to_course() {
        let storage = storage();
        storage.set_admin(1, true).unwrap();
        let algorithms = storage.add_course(new_course("Algorithms")).unwrap();
        let networks = storage.add_course(new_course("Networks")).unwrap();

        for session in [3, 1, 2, 5, 4] {
            storage.add_video(&submission(algorithms.id, 1, session)).unwrap();
        }
        storage.add_video(&submission(networks.id, 1, 1)).unwrap();

        let sessions = |page: &Page<VideoSessionSummary>| {
            page.items.iter().map(|v| v.session_number).collect::<Vec<_>>()
        };

        let first = storage.verified_videos_page(Pivot::Up, algorithms.id, 0, 2).unwrap();
        assert_eq!(sessions(&first), vec![1, 2]);
        assert!(!first.has_before);
        assert!(first.has_next);

        let middle = storage.verified_videos_page(Pivot::Up, algorithms.id, 3, 2).unwrap();
        assert_eq!(sessions(&middle), vec![3, 4]);
        assert!(middle.has_before);
        assert!(middle.has_next);

        let back = storage.verified_videos_page(Pivot::Down, algorithms.id, 2, 2).unwrap();
        assert_eq!(sessions(&back), vec![1, 2]);
        assert!(!back.has_before);

        let tail = storage.verified_videos_page(Pivot::Up, algorithms.id, 5, 2).unwrap();
        assert_eq!(sessions(&tail), vec![5]);
        assert!(!tail.has_next);

        let other = storage.verified_videos_page(Pivot::Up, networks.id, 0, 10).unwrap();
        assert_eq!(sessions(&other), vec![1]);
        assert!(!other.has_before && !other.has_next);

        assert_eq!(storage.next_session_number(algorithms.id).unwrap(), 6);
    }

    #[test]
    fn test_dump_contains_all_trees() {
        let storage = storage();
        let course = storage.add_course(new_course("Algorithms")).unwrap();
        storage.register_user(1, None, "Student".to_string()).unwrap();
        storage.add_video(&submission(course.id, 1, 1)).unwrap();

        let dump = storage.dump().unwrap();
        assert_eq!(dump["courses"].as_array().unwrap().len(), 1);
        assert_eq!(dump["users"].as_array().unwrap().len(), 1);
        assert_eq!(dump["videos"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_accept_and_reject_never_resurrects_video() {
        use std::sync::Barrier;

        let storage = storage();
        let course = storage.add_course(new_course("Algorithms")).unwrap();
        storage.register_user(1, None, "Student".to_string()).unwrap();

        for round in 0..300 {
            let (video_id, _) = storage.add_video(&submission(course.id, 1, round)).unwrap();
            let barrier = Barrier::new(2);

            let (verified, deleted) = std::thread::scope(|scope| {
                let verify = scope.spawn(|| {
                    barrier.wait();
                    storage.verify_video(video_id).unwrap()
                });
                let delete = scope.spawn(|| {
                    barrier.wait();
                    storage.delete_video(video_id).unwrap()
                });
                (verify.join().unwrap(), delete.join().unwrap())
            });

            // Whichever runs first, the reject wins and leaves nothing behind.
            assert!(deleted, "round {}: delete missed the video", round);
            assert!(storage.get_video(video_id).unwrap().is_none(), "round {}: verified={}", round, verified);
        }

        let page = storage.verified_videos_page(Pivot::Up, course.id, 0, 1000).unwrap();
        assert!(page.is_empty());
    }
}
